//! Core RequestFilter struct and construction.
//!
//! A filter pairs exact match keys (host, path, method) with a response
//! recipe: a descriptor plus exactly one payload source.

use super::state::FilterState;
use super::types::{MockRequest, Payload, ResponseDescriptor};
use crate::error::MockerError;
use std::fmt;
use std::sync::Arc;

/// Computes a payload for each matching request.
///
/// Invoked synchronously on the resolving thread. Anything that must persist
/// between invocations belongs in the filter's [`FilterState`].
pub type PayloadGenerator =
    Arc<dyn Fn(&RequestFilter, &MockRequest) -> anyhow::Result<Payload> + Send + Sync>;

/// Where a filter's response body comes from
#[derive(Clone)]
pub enum PayloadSource {
    Static(Payload),
    Generated(PayloadGenerator),
}

impl fmt::Debug for PayloadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadSource::Static(payload) => f.debug_tuple("Static").field(payload).finish(),
            PayloadSource::Generated(_) => f.write_str("Generated(<fn>)"),
        }
    }
}

/// A registered match-and-respond rule
#[derive(Debug)]
pub struct RequestFilter {
    name: String,
    host: String,
    path: String,
    method: String,
    response: ResponseDescriptor,
    source: PayloadSource,
    state: FilterState,
}

impl RequestFilter {
    /// Filter answering with a fixed payload and the default descriptor
    pub fn with_payload(
        host: impl Into<String>,
        path: impl Into<String>,
        method: impl Into<String>,
        payload: impl Into<Payload>,
    ) -> Self {
        Self::from_parts(
            None,
            host.into(),
            path.into(),
            method.into(),
            ResponseDescriptor::default(),
            PayloadSource::Static(payload.into()),
        )
    }

    /// Filter computing its payload per request, with the default descriptor
    pub fn with_generator<F>(
        host: impl Into<String>,
        path: impl Into<String>,
        method: impl Into<String>,
        generator: F,
    ) -> Self
    where
        F: Fn(&RequestFilter, &MockRequest) -> anyhow::Result<Payload> + Send + Sync + 'static,
    {
        Self::from_parts(
            None,
            host.into(),
            path.into(),
            method.into(),
            ResponseDescriptor::default(),
            PayloadSource::Generated(Arc::new(generator)),
        )
    }

    pub fn builder(
        host: impl Into<String>,
        path: impl Into<String>,
        method: impl Into<String>,
    ) -> RequestFilterBuilder {
        RequestFilterBuilder {
            name: None,
            host: host.into(),
            path: path.into(),
            method: method.into(),
            response: None,
            payload: None,
            generator: None,
        }
    }

    fn from_parts(
        name: Option<String>,
        host: String,
        path: String,
        method: String,
        response: ResponseDescriptor,
        source: PayloadSource,
    ) -> Self {
        let name = name.unwrap_or_else(|| format!("{method} {host} {path}"));
        Self {
            name,
            host,
            path,
            method,
            response,
            source,
            state: FilterState::new(),
        }
    }

    /// Exact, case-sensitive comparison of the match keys
    pub fn matches(&self, request: &MockRequest) -> bool {
        self.host == request.host && self.path == request.path && self.method == request.method
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn response(&self) -> &ResponseDescriptor {
        &self.response
    }

    pub fn source(&self) -> &PayloadSource {
        &self.source
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self.source, PayloadSource::Generated(_))
    }

    /// Mutable state owned by this filter
    pub fn state(&self) -> &FilterState {
        &self.state
    }
}

/// Builder for filters that need a custom descriptor or name.
///
/// `build` enforces that exactly one payload source was supplied.
pub struct RequestFilterBuilder {
    name: Option<String>,
    host: String,
    path: String,
    method: String,
    response: Option<ResponseDescriptor>,
    payload: Option<Payload>,
    generator: Option<PayloadGenerator>,
}

impl RequestFilterBuilder {
    /// Label used in logs, metrics and error messages
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn response(mut self, response: ResponseDescriptor) -> Self {
        self.response = Some(response);
        self
    }

    pub fn payload(mut self, payload: impl Into<Payload>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    pub fn generator<F>(mut self, generator: F) -> Self
    where
        F: Fn(&RequestFilter, &MockRequest) -> anyhow::Result<Payload> + Send + Sync + 'static,
    {
        self.generator = Some(Arc::new(generator));
        self
    }

    pub fn build(self) -> Result<RequestFilter, MockerError> {
        let source = match (self.payload, self.generator) {
            (Some(payload), None) => PayloadSource::Static(payload),
            (None, Some(generator)) => PayloadSource::Generated(generator),
            (Some(_), Some(_)) => {
                return Err(MockerError::ConflictingPayloadSources {
                    host: self.host,
                    path: self.path,
                    method: self.method,
                })
            }
            (None, None) => {
                return Err(MockerError::MissingPayloadSource {
                    host: self.host,
                    path: self.path,
                    method: self.method,
                })
            }
        };

        Ok(RequestFilter::from_parts(
            self.name,
            self.host,
            self.path,
            self.method,
            self.response.unwrap_or_default(),
            source,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_with_payload_defaults() {
        let filter = RequestFilter::with_payload(
            "api.example.com",
            "/login",
            "POST",
            json!({"token": "abc"}),
        );

        assert_eq!(filter.host(), "api.example.com");
        assert_eq!(filter.path(), "/login");
        assert_eq!(filter.method(), "POST");
        assert_eq!(filter.name(), "POST api.example.com /login");
        assert_eq!(filter.response(), &ResponseDescriptor::default());
        assert!(!filter.is_dynamic());
        assert!(filter.state().is_empty());
    }

    #[test]
    fn test_builder_rejects_missing_payload() {
        let result = RequestFilter::builder("h", "/p", "GET").build();
        assert!(matches!(
            result,
            Err(MockerError::MissingPayloadSource { .. })
        ));
    }

    #[test]
    fn test_builder_rejects_both_payload_sources() {
        let result = RequestFilter::builder("h", "/p", "GET")
            .payload("static")
            .generator(|_, _| Ok(Payload::Empty))
            .build();
        assert!(matches!(
            result,
            Err(MockerError::ConflictingPayloadSources { .. })
        ));
    }

    #[test]
    fn test_builder_with_descriptor_and_name() {
        let filter = RequestFilter::builder("h", "/p", "GET")
            .name("health")
            .response(ResponseDescriptor::new(204).header("X-Mock", "1"))
            .payload(())
            .build()
            .unwrap();

        assert_eq!(filter.name(), "health");
        assert_eq!(filter.response().status_code, 204);
        assert_eq!(
            filter.response().header_fields.get("X-Mock"),
            Some(&"1".to_string())
        );
    }

    #[test]
    fn test_matches_is_exact_and_case_sensitive() {
        let filter = RequestFilter::with_payload("api.example.com", "/login", "POST", "ok");

        assert!(filter.matches(&MockRequest::new("POST", "api.example.com", "/login")));
        assert!(!filter.matches(&MockRequest::new("post", "api.example.com", "/login")));
        assert!(!filter.matches(&MockRequest::new("POST", "api.example.com", "/login/")));
        assert!(!filter.matches(&MockRequest::new("POST", "api.example.com", "/log")));
        assert!(!filter.matches(&MockRequest::new("POST", "example.com", "/login")));
    }

    #[test]
    fn test_generator_sees_own_state() {
        let filter = RequestFilter::with_generator("h", "/p", "GET", |filter, _request| {
            Ok(Payload::from(json!(filter.state().increment("count"))))
        });

        let PayloadSource::Generated(generator) = filter.source().clone() else {
            panic!("expected generated source");
        };
        let request = MockRequest::new("GET", "h", "/p");

        assert_eq!(generator(&filter, &request).unwrap(), Payload::Json(json!(1)));
        assert_eq!(generator(&filter, &request).unwrap(), Payload::Json(json!(2)));
        assert_eq!(filter.state().get("count"), Some(json!(2)));
    }

    #[test]
    fn test_payload_source_debug() {
        let filter = RequestFilter::with_generator("h", "/p", "GET", |_, _| Ok(Payload::Empty));
        let debug_str = format!("{filter:?}");
        assert!(debug_str.contains("Generated(<fn>)"));
    }
}
