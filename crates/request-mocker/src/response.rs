//! Synthesized responses and their conversion into hyper responses.

use crate::error::MockerError;
use bytes::Bytes;
use http_body_util::Full;
use hyper::http::{HeaderName, HeaderValue, Version};
use hyper::{Response, StatusCode};
use std::collections::HashMap;
use std::str::FromStr;

/// Response produced for an intercepted request
#[derive(Debug, Clone, PartialEq)]
pub struct MockResponse {
    pub status_code: u16,
    pub http_version: String,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl MockResponse {
    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    /// Parse the body as JSON
    pub fn json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Convert into a hyper response.
    ///
    /// Fails when the status code is outside 100..=999 or a header name or
    /// value is not valid HTTP. Keys differing only in case are all sent.
    pub fn into_hyper(self) -> Result<Response<Full<Bytes>>, MockerError> {
        let status = StatusCode::from_u16(self.status_code).map_err(|_| {
            MockerError::InvalidResponse(format!("invalid status code {}", self.status_code))
        })?;

        let mut response = Response::new(Full::new(self.body));
        *response.status_mut() = status;
        *response.version_mut() = parse_version(&self.http_version);

        for (key, value) in &self.headers {
            let name = HeaderName::from_str(key)
                .map_err(|_| MockerError::InvalidResponse(format!("invalid header name '{key}'")))?;
            let value = HeaderValue::from_str(value).map_err(|_| {
                MockerError::InvalidResponse(format!("invalid value for header '{key}'"))
            })?;
            response.headers_mut().append(name, value);
        }

        Ok(response)
    }
}

/// Map a version string onto hyper's enum, defaulting to HTTP/1.1
fn parse_version(version: &str) -> Version {
    match version.trim().to_ascii_uppercase().as_str() {
        "HTTP/0.9" => Version::HTTP_09,
        "HTTP/1.0" => Version::HTTP_10,
        "HTTP/2" | "HTTP/2.0" => Version::HTTP_2,
        "HTTP/3" | "HTTP/3.0" => Version::HTTP_3,
        _ => Version::HTTP_11,
    }
}
