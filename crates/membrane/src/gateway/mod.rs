use crate::pool::WorkerPool;
use crate::trigger::{sniff_content_type, NormalizedRequest, NormalizedResponse};
use anyhow::Context;
use futures::FutureExt;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;

mod http;
pub use http::HttpGateway;

/// Gateway is the ingress of a membrane: it receives triggers from an
/// event source, normalizes them, and passes each to the provided Handler.
///
/// `start` runs for the lifetime of the gateway, and its result
/// is the result of the membrane.
#[async_trait::async_trait]
pub trait Gateway: Send + Sync {
    async fn start(&self, handler: Handler) -> anyhow::Result<()>;
}

/// Handler dispatches normalized triggers to the function.
#[derive(Clone)]
pub enum Handler {
    /// Forward each trigger as an HTTP request to the child process.
    Http(HttpForwarder),
    /// Dispatch each trigger to a worker of the pool.
    Pool(WorkerPool),
}

impl Handler {
    /// Handle a trigger, mapping any failure into a 503 response.
    pub async fn handle(&self, request: NormalizedRequest) -> NormalizedResponse {
        let request_id = request.context.request_id.clone();

        match AssertUnwindSafe(self.dispatch(request)).catch_unwind().await {
            Ok(Ok(response)) => response,
            Ok(Err(error)) => {
                tracing::warn!(
                    %request_id,
                    error = format!("{error:#}"),
                    "failed to handle trigger"
                );
                NormalizedResponse::from_error(&error)
            }
            Err(panic) => {
                let error = match panic.downcast_ref::<&str>() {
                    Some(msg) => anyhow::anyhow!("trigger handler panicked: {msg}"),
                    None => match panic.downcast_ref::<String>() {
                        Some(msg) => anyhow::anyhow!("trigger handler panicked: {msg}"),
                        None => anyhow::anyhow!("trigger handler panicked"),
                    },
                };
                tracing::error!(%request_id, %error, "failed to handle trigger");
                NormalizedResponse::from_error(&error)
            }
        }
    }

    async fn dispatch(&self, request: NormalizedRequest) -> anyhow::Result<NormalizedResponse> {
        match self {
            Self::Http(forwarder) => forwarder.forward(request).await,
            Self::Pool(pool) => Ok(pool
                .dispatch(request)
                .await
                .context("failed to dispatch trigger to worker")?),
        }
    }
}

/// HttpForwarder delivers triggers to a child process as HTTP requests.
#[derive(Clone)]
pub struct HttpForwarder {
    url: String,
    client: reqwest::Client,
}

impl HttpForwarder {
    pub fn new(child_address: &str) -> Self {
        Self {
            url: format!("http://{child_address}/"),
            client: reqwest::Client::new(),
        }
    }

    /// POST the trigger payload to the child, carrying its context as
    /// `x-nitric-*` headers. Response headers are flattened to their
    /// first value.
    pub async fn forward(&self, request: NormalizedRequest) -> anyhow::Result<NormalizedResponse> {
        let NormalizedRequest {
            context, payload, ..
        } = request;

        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, sniff_content_type(&payload))
            .header("x-nitric-payload-type", context.payload_type)
            .header("x-nitric-request-id", context.request_id)
            .header("x-nitric-source-type", context.source_type.as_str_name())
            .header("x-nitric-source", context.source)
            .body(payload)
            .send()
            .await
            .with_context(|| format!("failed to forward trigger to {}", self.url))?;

        let status = response.status().as_u16();
        let mut headers = BTreeMap::new();

        for (name, value) in response.headers() {
            headers
                .entry(name.to_string())
                .or_insert_with(|| String::from_utf8_lossy(value.as_bytes()).into_owned());
        }
        let body = response
            .bytes()
            .await
            .context("failed to read response body of function")?;

        Ok(NormalizedResponse {
            headers,
            status,
            body,
        })
    }
}
