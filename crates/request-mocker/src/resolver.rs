//! ResponseResolver - turns an intercepted request into a synthesized response.
//!
//! Resolution is a single synchronous call: find the first matching filter,
//! produce its payload (static or generated), and merge the payload with the
//! filter's response descriptor.

use crate::error::MockerError;
use crate::filter::{MockRequest, Payload, PayloadSource, RequestFilter, ResponseDescriptor};
use crate::metrics::{self, Outcome};
use crate::registry::FilterRegistry;
use crate::response::MockResponse;
use std::collections::HashMap;
use tracing::{debug, warn};

const CONTENT_TYPE: &str = "Content-Type";

/// Resolves requests against a [`FilterRegistry`]
#[derive(Debug, Clone, Default)]
pub struct ResponseResolver {
    registry: FilterRegistry,
}

impl ResponseResolver {
    pub fn new(registry: FilterRegistry) -> Self {
        Self { registry }
    }

    /// Resolver over the process-wide registry
    pub fn global() -> Self {
        Self::new(FilterRegistry::global())
    }

    pub fn registry(&self) -> &FilterRegistry {
        &self.registry
    }

    /// Resolve a request.
    ///
    /// Returns `Ok(None)` when no filter matches. A failing payload generator
    /// is reported as [`MockerError::Generator`]; a panicking one unwinds
    /// through this call.
    pub fn resolve(&self, request: &MockRequest) -> Result<Option<MockResponse>, MockerError> {
        let Some(filter) = self.registry.find_match(request) else {
            metrics::record_outcome(Outcome::Unhandled);
            return Ok(None);
        };

        match Self::produce_payload(&filter, request) {
            Ok(payload) => {
                metrics::record_outcome(Outcome::Handled);
                Ok(Some(build_response(filter.response(), &payload)))
            }
            Err(e) => {
                metrics::record_outcome(Outcome::Error);
                Err(e)
            }
        }
    }

    fn produce_payload(
        filter: &RequestFilter,
        request: &MockRequest,
    ) -> Result<Payload, MockerError> {
        match filter.source() {
            PayloadSource::Static(payload) => Ok(payload.clone()),
            PayloadSource::Generated(generator) => {
                debug!("Invoking payload generator for filter '{}'", filter.name());
                generator(filter, request).map_err(|source| {
                    warn!(
                        "Payload generator for filter '{}' failed: {}",
                        filter.name(),
                        source
                    );
                    MockerError::Generator {
                        filter: filter.name().to_string(),
                        source,
                    }
                })
            }
        }
    }
}

/// Merge a descriptor and a payload into a concrete response.
///
/// An explicit content type replaces any header of the same name, compared
/// case-insensitively. Without one, JSON payloads get `application/json`
/// unless the descriptor already carries a content-type header.
pub fn build_response(descriptor: &ResponseDescriptor, payload: &Payload) -> MockResponse {
    let mut headers: HashMap<String, String> = descriptor.header_fields.clone();

    match &descriptor.content_type {
        Some(content_type) => {
            headers.retain(|k, _| !k.eq_ignore_ascii_case(CONTENT_TYPE));
            headers.insert(CONTENT_TYPE.to_string(), content_type.clone());
        }
        None => {
            let has_content_type = headers.keys().any(|k| k.eq_ignore_ascii_case(CONTENT_TYPE));
            if payload.is_json() && !has_content_type {
                headers.insert(CONTENT_TYPE.to_string(), "application/json".to_string());
            }
        }
    }

    MockResponse {
        status_code: descriptor.status_code,
        http_version: descriptor.http_version.clone(),
        headers,
        body: payload.to_bytes(),
    }
}
