//! Type definitions shared by filters, the resolver and the interception hook.
//!
//! This module contains the request view a filter is matched against, the
//! payload a filter answers with, and the response descriptor that shapes the
//! synthesized response.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// Request Types
// ============================================================================

/// An outbound request as seen by the mocking engine.
///
/// Only `method`, `host` and `path` take part in matching. The remaining
/// fields are handed to payload generators untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MockRequest {
    pub method: String,
    pub host: String,
    pub path: String,
    pub query: Option<String>,
    /// Lowercase names when built from a hyper request. Repeated headers are
    /// joined with `", "` and non-UTF-8 bytes are replaced with U+FFFD.
    pub headers: HashMap<String, String>,
    pub body: Option<Bytes>,
}

impl MockRequest {
    pub fn new(
        method: impl Into<String>,
        host: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            method: method.into(),
            host: host.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    /// Build a request from an absolute or origin-form URI.
    ///
    /// An empty path is normalized to `/`.
    pub fn from_uri(method: impl Into<String>, uri: &hyper::Uri) -> Self {
        let path = match uri.path() {
            "" => "/".to_string(),
            p => p.to_string(),
        };
        Self {
            method: method.into(),
            host: uri.host().unwrap_or_default().to_string(),
            path,
            query: uri.query().map(str::to_string),
            ..Default::default()
        }
    }

    /// Build a request from a hyper request head.
    ///
    /// Origin-form requests (no authority in the URI) take their host from the
    /// `Host` header, with any port suffix removed.
    pub fn from_parts(parts: &hyper::http::request::Parts, body: Option<Bytes>) -> Self {
        let mut request = Self::from_uri(parts.method.as_str(), &parts.uri);

        for (name, value) in parts.headers.iter() {
            let value = String::from_utf8_lossy(value.as_bytes());
            request
                .headers
                .entry(name.as_str().to_string())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(&value);
                })
                .or_insert_with(|| value.into_owned());
        }

        if request.host.is_empty() {
            if let Some(host) = parts
                .headers
                .get(hyper::header::HOST)
                .and_then(|v| v.to_str().ok())
            {
                request.host = strip_port(host).to_string();
            }
        }

        request.body = body.filter(|b| !b.is_empty());
        request
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body decoded as UTF-8, if present and valid
    pub fn body_str(&self) -> Option<&str> {
        self.body
            .as_ref()
            .and_then(|b| std::str::from_utf8(b).ok())
    }
}

fn strip_port(authority: &str) -> &str {
    // Bracketed IPv6 literal, e.g. "[::1]:8080"
    if authority.starts_with('[') {
        return match authority.find(']') {
            Some(end) => &authority[..=end],
            None => authority,
        };
    }
    authority.split(':').next().unwrap_or(authority)
}

// ============================================================================
// Payload Types
// ============================================================================

/// Body source of a synthesized response.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Payload {
    /// No body
    #[default]
    Empty,
    /// UTF-8 text, emitted verbatim
    Text(String),
    /// Raw bytes, emitted verbatim
    Bytes(Bytes),
    /// Structured value, emitted as compact JSON
    Json(serde_json::Value),
}

impl Payload {
    /// Render the payload into response body bytes
    pub fn to_bytes(&self) -> Bytes {
        match self {
            Payload::Empty => Bytes::new(),
            Payload::Text(s) => Bytes::from(s.clone()),
            Payload::Bytes(b) => b.clone(),
            Payload::Json(v) => Bytes::from(v.to_string()),
        }
    }

    pub fn is_json(&self) -> bool {
        matches!(self, Payload::Json(_))
    }
}

impl From<()> for Payload {
    fn from(_: ()) -> Self {
        Payload::Empty
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Payload::Text(s.to_string())
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Payload::Text(s)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(b: Vec<u8>) -> Self {
        Payload::Bytes(Bytes::from(b))
    }
}

impl From<Bytes> for Payload {
    fn from(b: Bytes) -> Self {
        Payload::Bytes(b)
    }
}

impl From<serde_json::Value> for Payload {
    fn from(v: serde_json::Value) -> Self {
        Payload::Json(v)
    }
}

// ============================================================================
// Response Descriptor
// ============================================================================

pub(crate) fn default_status_code() -> u16 {
    200
}

pub(crate) fn default_http_version() -> String {
    "HTTP/1.1".to_string()
}

/// Deserialize statusCode from either a number or a string
pub(crate) fn deserialize_status_code<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .and_then(|n| u16::try_from(n).ok())
            .ok_or_else(|| D::Error::custom("invalid status code number")),
        serde_json::Value::String(s) => s
            .parse::<u16>()
            .map_err(|_| D::Error::custom(format!("invalid status code string: {s}"))),
        _ => Err(D::Error::custom("statusCode must be a number or string")),
    }
}

/// Shape of the synthesized response, minus the body.
///
/// Every field is optional in serialized form; missing fields take the
/// defaults of a plain `200 HTTP/1.1` response with no headers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseDescriptor {
    #[serde(
        default = "default_status_code",
        deserialize_with = "deserialize_status_code"
    )]
    pub status_code: u16,
    #[serde(default = "default_http_version")]
    pub http_version: String,
    /// Header keys keep the case they were given
    #[serde(default)]
    pub header_fields: HashMap<String, String>,
    /// Applied as `Content-Type`, replacing any header of the same name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl Default for ResponseDescriptor {
    fn default() -> Self {
        Self {
            status_code: default_status_code(),
            http_version: default_http_version(),
            header_fields: HashMap::new(),
            content_type: None,
        }
    }
}

impl ResponseDescriptor {
    pub fn new(status_code: u16) -> Self {
        Self {
            status_code,
            ..Default::default()
        }
    }

    pub fn http_version(mut self, version: impl Into<String>) -> Self {
        self.http_version = version.into();
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.header_fields.insert(name.into(), value.into());
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Body encoding of a declarative payload (text by default)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BodyMode {
    /// Body is UTF-8 text or a JSON value
    #[default]
    Text,
    /// Body is a base64-encoded string
    Binary,
}
