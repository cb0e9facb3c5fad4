use bytes::Bytes;
use proto_nitric::faas;
use std::collections::BTreeMap;

/// SourceType is the kind of event source which produced a trigger.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SourceType {
    #[default]
    Request,
    Subscription,
    Custom,
}

impl SourceType {
    pub fn as_str_name(&self) -> &'static str {
        self.to_proto().as_str_name()
    }

    pub fn to_proto(self) -> faas::SourceType {
        match self {
            Self::Request => faas::SourceType::Request,
            Self::Subscription => faas::SourceType::Subscription,
            Self::Custom => faas::SourceType::Custom,
        }
    }

    pub fn from_proto(source_type: faas::SourceType) -> Self {
        match source_type {
            faas::SourceType::Request => Self::Request,
            faas::SourceType::Subscription => Self::Subscription,
            faas::SourceType::Custom => Self::Custom,
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str_name())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{0:?} is not a valid source type (expected REQUEST, SUBSCRIPTION, or CUSTOM)")]
pub struct InvalidSourceType(String);

impl std::str::FromStr for SourceType {
    type Err = InvalidSourceType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        faas::SourceType::from_str_name(&s.to_ascii_uppercase())
            .map(Self::from_proto)
            .ok_or_else(|| InvalidSourceType(s.to_string()))
    }
}

/// TriggerContext describes where a trigger came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerContext {
    pub request_id: String,
    pub payload_type: String,
    pub source: String,
    pub source_type: SourceType,
}

impl TriggerContext {
    /// Build a TriggerContext, generating a UUIDv4 request id
    /// if `request_id` is absent or empty.
    pub fn new(
        request_id: Option<String>,
        payload_type: impl Into<String>,
        source: impl Into<String>,
        source_type: SourceType,
    ) -> Self {
        let request_id = match request_id {
            Some(id) if !id.is_empty() => id,
            _ => uuid::Uuid::new_v4().to_string(),
        };
        Self {
            request_id,
            payload_type: payload_type.into(),
            source: source.into(),
            source_type,
        }
    }
}

/// NormalizedRequest is the source-agnostic form of an inbound trigger.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRequest {
    pub context: TriggerContext,
    pub content_type: String,
    pub payload: Bytes,
}

impl NormalizedRequest {
    /// Build a NormalizedRequest. The content type is sniffed
    /// from the payload if not provided.
    pub fn new(
        context: TriggerContext,
        content_type: Option<String>,
        payload: impl Into<Bytes>,
    ) -> Self {
        let payload = payload.into();
        let content_type = match content_type {
            Some(content_type) if !content_type.is_empty() => content_type,
            _ => sniff_content_type(&payload).to_string(),
        };
        Self {
            context,
            content_type,
            payload,
        }
    }
}

impl From<NormalizedRequest> for faas::TriggerRequest {
    fn from(request: NormalizedRequest) -> Self {
        let NormalizedRequest {
            context:
                TriggerContext {
                    request_id,
                    payload_type,
                    source,
                    source_type,
                },
            content_type,
            payload,
        } = request;

        Self {
            data: payload,
            mime_type: content_type,
            request_id,
            payload_type,
            source,
            source_type: source_type.to_proto() as i32,
        }
    }
}

/// NormalizedResponse is the source-agnostic result of handling a trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedResponse {
    pub headers: BTreeMap<String, String>,
    pub status: u16,
    pub body: Bytes,
}

impl NormalizedResponse {
    /// Synthesize a 503 response describing `error`.
    pub fn from_error(error: &anyhow::Error) -> Self {
        Self {
            headers: [("Content-Type".to_string(), mime::TEXT_PLAIN.to_string())].into(),
            status: 503,
            body: Bytes::from(format!("{error:#}")),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("trigger response has invalid status {0}")]
pub struct InvalidStatus(i32);

impl TryFrom<faas::TriggerResponse> for NormalizedResponse {
    type Error = InvalidStatus;

    fn try_from(response: faas::TriggerResponse) -> Result<Self, Self::Error> {
        let faas::TriggerResponse {
            data,
            status,
            headers,
        } = response;

        let status = match u16::try_from(status) {
            Ok(status) if (100..=999).contains(&status) => status,
            _ => return Err(InvalidStatus(status)),
        };

        Ok(Self {
            headers: headers.into_iter().collect(),
            status,
            body: data,
        })
    }
}

/// Determine the content type of `body` from its leading bytes.
pub fn sniff_content_type(body: &[u8]) -> &'static str {
    let head = &body[..body.len().min(512)];

    const SIGNATURES: &[(&[u8], &str)] = &[
        (b"%PDF-", "application/pdf"),
        (b"\x89PNG\r\n\x1a\n", "image/png"),
        (b"GIF87a", "image/gif"),
        (b"GIF89a", "image/gif"),
        (b"\xff\xd8\xff", "image/jpeg"),
        (b"PK\x03\x04", "application/zip"),
        (b"\x1f\x8b\x08", "application/x-gzip"),
    ];
    for (prefix, content_type) in SIGNATURES {
        if head.starts_with(prefix) {
            return *content_type;
        }
    }

    let trimmed = match head.iter().position(|b| !b.is_ascii_whitespace()) {
        Some(start) => &head[start..],
        None => &[],
    };
    if starts_with_ignore_case(trimmed, b"<?xml") {
        return "text/xml; charset=utf-8";
    }
    for tag in HTML_TAGS {
        if starts_with_ignore_case(trimmed, tag)
            && matches!(trimmed.get(tag.len()), Some(b' ' | b'>'))
        {
            return "text/html; charset=utf-8";
        }
    }

    if head.iter().any(|b| is_binary_byte(*b)) {
        "application/octet-stream"
    } else {
        "text/plain; charset=utf-8"
    }
}

const HTML_TAGS: &[&[u8]] = &[
    b"<!DOCTYPE HTML",
    b"<HTML",
    b"<HEAD",
    b"<SCRIPT",
    b"<IFRAME",
    b"<H1",
    b"<DIV",
    b"<FONT",
    b"<TABLE",
    b"<A",
    b"<STYLE",
    b"<TITLE",
    b"<B",
    b"<BODY",
    b"<BR",
    b"<P",
    b"<!--",
];

fn starts_with_ignore_case(data: &[u8], prefix: &[u8]) -> bool {
    data.len() >= prefix.len() && data[..prefix.len()].eq_ignore_ascii_case(prefix)
}

fn is_binary_byte(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_source_type_names() {
        let names: Vec<_> = [
            SourceType::Request,
            SourceType::Subscription,
            SourceType::Custom,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        insta::assert_debug_snapshot!(names, @r###"
        [
            "REQUEST",
            "SUBSCRIPTION",
            "CUSTOM",
        ]
        "###);

        assert_eq!(
            "subscription".parse::<SourceType>().unwrap(),
            SourceType::Subscription
        );
        insta::assert_snapshot!(
            "cron".parse::<SourceType>().unwrap_err(),
            @r###""cron" is not a valid source type (expected REQUEST, SUBSCRIPTION, or CUSTOM)"###
        );
    }

    #[test]
    fn test_request_id_generation() {
        let generated = TriggerContext::new(None, "", "", SourceType::Request);
        assert!(uuid::Uuid::parse_str(&generated.request_id).is_ok());

        let empty = TriggerContext::new(Some(String::new()), "", "", SourceType::Request);
        assert!(uuid::Uuid::parse_str(&empty.request_id).is_ok());
        assert_ne!(generated.request_id, empty.request_id);

        let given = TriggerContext::new(Some("1234".to_string()), "", "", SourceType::Request);
        assert_eq!(given.request_id, "1234");
    }

    #[test]
    fn test_sniffing() {
        let cases: [(&[u8], &str); 10] = [
            (b"", "text/plain; charset=utf-8"),
            (b"Test", "text/plain; charset=utf-8"),
            (br#"{"a": true}"#, "text/plain; charset=utf-8"),
            (b"  <html><body/></html>", "text/html; charset=utf-8"),
            (b"<!DOCTYPE html>", "text/html; charset=utf-8"),
            (b"<?xml version=\"1.0\"?>", "text/xml; charset=utf-8"),
            (b"%PDF-1.4", "application/pdf"),
            (b"\x89PNG\r\n\x1a\nrest", "image/png"),
            (b"\x1f\x8b\x08\x00", "application/x-gzip"),
            (b"\x00\x01\x02", "application/octet-stream"),
        ];
        for (body, expect) in cases {
            assert_eq!(sniff_content_type(body), expect, "body {body:?}");
        }

        let request = NormalizedRequest::new(
            TriggerContext::new(None, "", "", SourceType::Request),
            None,
            "<p>hi</p>",
        );
        assert_eq!(request.content_type, "text/html; charset=utf-8");
    }

    #[test]
    fn test_wire_conversions() {
        let request = NormalizedRequest::new(
            TriggerContext::new(
                Some("req-1".to_string()),
                "order",
                "orders-topic",
                SourceType::Subscription,
            ),
            Some("application/json".to_string()),
            r#"{"id":1}"#,
        );
        assert_eq!(
            faas::TriggerRequest::from(request),
            faas::TriggerRequest {
                data: r#"{"id":1}"#.into(),
                mime_type: "application/json".to_string(),
                request_id: "req-1".to_string(),
                payload_type: "order".to_string(),
                source: "orders-topic".to_string(),
                source_type: faas::SourceType::Subscription as i32,
            }
        );

        let response = faas::TriggerResponse {
            data: "ok".into(),
            status: 201,
            headers: [("x-one".to_string(), "1".to_string())].into(),
        };
        insta::assert_debug_snapshot!(NormalizedResponse::try_from(response).unwrap(), @r###"
        NormalizedResponse {
            headers: {
                "x-one": "1",
            },
            status: 201,
            body: b"ok",
        }
        "###);

        let bad = faas::TriggerResponse {
            status: -1,
            ..Default::default()
        };
        insta::assert_snapshot!(
            NormalizedResponse::try_from(bad).unwrap_err(),
            @"trigger response has invalid status -1"
        );
    }

    #[test]
    fn test_from_error() {
        let error = anyhow::anyhow!("no workers available").context("failed to dispatch");
        insta::assert_debug_snapshot!(NormalizedResponse::from_error(&error), @r###"
        NormalizedResponse {
            headers: {
                "Content-Type": "text/plain",
            },
            status: 503,
            body: b"failed to dispatch: no workers available",
        }
        "###);
    }
}
