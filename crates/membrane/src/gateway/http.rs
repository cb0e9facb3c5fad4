use super::{Gateway, Handler};
use crate::trigger::{NormalizedRequest, NormalizedResponse, SourceType, TriggerContext};
use anyhow::Context;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::Response;

/// HttpGateway receives triggers as HTTP requests of any method and path.
///
/// Trigger context is read from `x-nitric-request-id`, `x-nitric-payload-type`,
/// `x-nitric-source` and `x-nitric-source-type` headers, and the request body
/// is the trigger payload.
pub struct HttpGateway {
    address: String,
}

impl HttpGateway {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

#[async_trait::async_trait]
impl Gateway for HttpGateway {
    async fn start(&self, handler: Handler) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.address)
            .await
            .with_context(|| format!("failed to bind gateway address {}", self.address))?;

        tracing::info!(address = %self.address, "gateway listening for triggers");
        serve(listener, handler).await
    }
}

/// Serve triggers received over `listener` until an error occurs.
pub async fn serve(listener: tokio::net::TcpListener, handler: Handler) -> anyhow::Result<()> {
    let app = axum::Router::new().fallback(ingress).with_state(handler);

    axum::serve(listener, app)
        .await
        .context("gateway server failed")
}

async fn ingress(State(handler): State<Handler>, headers: HeaderMap, body: Bytes) -> Response {
    let response = match decode(&headers, body) {
        Ok(request) => handler.handle(request).await,
        Err(error) => {
            tracing::warn!(error = format!("{error:#}"), "failed to decode trigger");
            NormalizedResponse::from_error(&error)
        }
    };
    encode(response)
}

fn decode(headers: &HeaderMap, body: Bytes) -> anyhow::Result<NormalizedRequest> {
    let get = |name: &str| -> anyhow::Result<Option<String>> {
        match headers.get(name) {
            None => Ok(None),
            Some(value) => value
                .to_str()
                .map(|v| Some(v.to_string()))
                .with_context(|| format!("header {name} is not valid text")),
        }
    };

    let source_type = match get("x-nitric-source-type")? {
        Some(source_type) => source_type.parse::<SourceType>()?,
        None => SourceType::Request,
    };
    let context = TriggerContext::new(
        get("x-nitric-request-id")?,
        get("x-nitric-payload-type")?.unwrap_or_default(),
        get("x-nitric-source")?.unwrap_or_default(),
        source_type,
    );

    Ok(NormalizedRequest::new(
        context,
        get(header::CONTENT_TYPE.as_str())?,
        body,
    ))
}

fn encode(response: NormalizedResponse) -> Response {
    let NormalizedResponse {
        headers,
        status,
        body,
    } = response;

    let mut out = Response::new(Body::from(body));
    *out.status_mut() = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    for (name, value) in headers {
        let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name.as_str()),
            HeaderValue::try_from(value.as_str()),
        ) else {
            tracing::warn!(%name, "dropping invalid response header");
            continue;
        };
        // Framing headers are computed by the server.
        if name == header::CONTENT_LENGTH || name == header::CONNECTION {
            continue;
        }
        out.headers_mut().insert(name, value);
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::gateway::testing::mock_function;
    use crate::gateway::HttpForwarder;
    use crate::pool::{PoolOptions, WorkerPool};

    async fn start(handler: Handler) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        tokio::spawn(serve(listener, handler));
        address
    }

    #[test]
    fn test_decode() {
        let mut headers = HeaderMap::new();
        headers.insert("x-nitric-request-id", HeaderValue::from_static("abc"));
        headers.insert("x-nitric-payload-type", HeaderValue::from_static("order"));
        headers.insert("x-nitric-source", HeaderValue::from_static("orders"));
        headers.insert("x-nitric-source-type", HeaderValue::from_static("subscription"));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

        insta::assert_debug_snapshot!(decode(&headers, Bytes::from_static(b"{}")).unwrap(), @r###"
        NormalizedRequest {
            context: TriggerContext {
                request_id: "abc",
                payload_type: "order",
                source: "orders",
                source_type: Subscription,
            },
            content_type: "application/json",
            payload: b"{}",
        }
        "###);

        // Context defaults when headers are absent.
        let request = decode(&HeaderMap::new(), Bytes::from_static(b"hi")).unwrap();
        assert_eq!(request.context.source_type, SourceType::Request);
        assert_eq!(request.content_type, "text/plain; charset=utf-8");
        assert!(!request.context.request_id.is_empty());

        headers.insert("x-nitric-source-type", HeaderValue::from_static("cron"));
        insta::assert_snapshot!(
            decode(&headers, Bytes::new()).unwrap_err(),
            @r###""cron" is not a valid source type (expected REQUEST, SUBSCRIPTION, or CUSTOM)"###
        );
    }

    #[test]
    fn test_encode_drops_framing_headers() {
        let response = encode(NormalizedResponse {
            headers: [
                ("Content-Length".to_string(), "999".to_string()),
                ("Connection".to_string(), "close".to_string()),
                ("X-Custom".to_string(), "yes".to_string()),
                ("bad header".to_string(), "x".to_string()),
            ]
            .into(),
            status: 201,
            body: Bytes::from_static(b"created"),
        });

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers().len(), 1);
        assert_eq!(response.headers()["x-custom"], "yes");
    }

    #[tokio::test]
    async fn test_gateway_to_function() {
        let (function, recorded) = mock_function().await;
        let address = start(Handler::Http(HttpForwarder::new(&function))).await;

        let response = reqwest::Client::new()
            .put(format!("http://{address}/any/path"))
            .header("x-nitric-request-id", "req-9")
            .header("x-nitric-source-type", "CUSTOM")
            .body("payload")
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        assert_eq!(response.headers()["x-extra"], "one");
        assert_eq!(response.text().await.unwrap(), "Test");

        let recorded = recorded.lock().unwrap();
        let (headers, body) = &recorded[0];
        assert_eq!(body, "payload");
        assert_eq!(headers["x-nitric-request-id"], "req-9");
        assert_eq!(headers["x-nitric-source-type"], "CUSTOM");
    }

    #[tokio::test]
    async fn test_gateway_errors_are_503() {
        let pool = WorkerPool::new(PoolOptions::default());
        let address = start(Handler::Pool(pool)).await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("http://{address}/"))
            .body("hi")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 503);
        assert_eq!(
            response.text().await.unwrap(),
            "failed to dispatch trigger to worker: no workers available"
        );

        let response = client
            .post(format!("http://{address}/"))
            .header("x-nitric-source-type", "cron")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 503);
    }
}
