//! Declarative filter definitions.

use crate::error::MockerError;
use crate::filter::{BodyMode, Payload, RequestFilter, ResponseDescriptor};
use base64::Engine;
use serde::{Deserialize, Serialize};

/// One filter as written in a definitions file.
///
/// Only static payloads can be declared; generators are code-only.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub host: String,
    pub path: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseDescriptor>,
    /// Strings are sent verbatim, other values as JSON
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    /// "text" (default) or "binary" (body is base64-encoded)
    #[serde(rename = "_mode", default)]
    pub mode: BodyMode,
}

impl FilterSpec {
    /// Check the definition, reporting problems against its position in the file
    pub fn validate(&self, index: usize) -> Result<(), MockerError> {
        let invalid = |reason: String| MockerError::InvalidDefinition { index, reason };

        if self.host.trim().is_empty() {
            return Err(invalid("host must not be empty".to_string()));
        }
        if self.method.trim().is_empty() {
            return Err(invalid("method must not be empty".to_string()));
        }
        if !self.path.starts_with('/') {
            return Err(invalid(format!(
                "path '{}' must start with '/'",
                self.path
            )));
        }

        self.payload(index).map(|_| ())
    }

    /// Decode the declared body into a payload
    pub fn payload(&self, index: usize) -> Result<Payload, MockerError> {
        let invalid = |reason: String| MockerError::InvalidDefinition { index, reason };

        let Some(body) = &self.body else {
            return Err(invalid("body is required".to_string()));
        };

        match (self.mode, body) {
            (BodyMode::Text, serde_json::Value::String(text)) => Ok(Payload::Text(text.clone())),
            (BodyMode::Text, value) => Ok(Payload::Json(value.clone())),
            (BodyMode::Binary, serde_json::Value::String(encoded)) => {
                base64::engine::general_purpose::STANDARD
                    .decode(encoded.trim())
                    .map(Payload::from)
                    .map_err(|e| invalid(format!("binary body is not valid base64: {e}")))
            }
            (BodyMode::Binary, _) => Err(invalid(
                "binary body must be a base64-encoded string".to_string(),
            )),
        }
    }

    /// Build the filter this definition describes
    pub fn into_filter(self, index: usize) -> Result<RequestFilter, MockerError> {
        self.validate(index)?;
        let payload = self.payload(index)?;

        let mut builder = RequestFilter::builder(self.host, self.path, self.method)
            .response(self.response.unwrap_or_default())
            .payload(payload);
        if let Some(name) = self.name {
            builder = builder.name(name);
        }
        builder.build()
    }
}
