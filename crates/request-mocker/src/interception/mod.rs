//! Boundary between the host networking stack and the mocking engine.
//!
//! The host hook asks two questions per request: `can_handle` ("is this
//! mine?") and, only when the answer was yes, `handle` ("what do I return?").
//! Hooks depend on the [`RequestInterceptor`] trait so they can be exercised
//! with a fake, without the real engine.
//!
//! ## Module Structure
//!
//! - `server`: loopback HTTP/1 listener acting as a host hook
//! - `forward`: fall-through policy for requests no filter handles

mod forward;
mod server;

pub use forward::{Fallthrough, FORWARDED_HEADER, UNHANDLED_HEADER};
pub use server::InterceptServer;

use crate::error::MockerError;
use crate::filter::MockRequest;
use crate::registry::FilterRegistry;
use crate::resolver::ResponseResolver;
use crate::response::MockResponse;

/// Contract the host hook relies on
pub trait RequestInterceptor: Send + Sync {
    /// Cheap, side-effect-free check that a filter matches `request`
    fn can_handle(&self, request: &MockRequest) -> bool;

    /// Produce the response for `request`.
    ///
    /// Precondition: `can_handle(request)` returned true. Implementations may
    /// report a violation as an error instead of guarding against it.
    fn handle(&self, request: &MockRequest) -> Result<MockResponse, MockerError>;
}

/// [`RequestInterceptor`] backed by a filter registry
#[derive(Debug, Clone, Default)]
pub struct MockInterceptor {
    resolver: ResponseResolver,
}

impl MockInterceptor {
    pub fn new(registry: FilterRegistry) -> Self {
        Self {
            resolver: ResponseResolver::new(registry),
        }
    }

    /// Interceptor over the process-wide registry
    pub fn global() -> Self {
        Self {
            resolver: ResponseResolver::global(),
        }
    }

    pub fn resolver(&self) -> &ResponseResolver {
        &self.resolver
    }
}

impl RequestInterceptor for MockInterceptor {
    fn can_handle(&self, request: &MockRequest) -> bool {
        self.resolver.registry().find_match(request).is_some()
    }

    fn handle(&self, request: &MockRequest) -> Result<MockResponse, MockerError> {
        // The registry may have been replaced between can_handle and handle
        self.resolver
            .resolve(request)?
            .ok_or_else(|| MockerError::Unhandled {
                host: request.host.clone(),
                path: request.path.clone(),
                method: request.method.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{Payload, RequestFilter};
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_can_handle_matches_find_match() {
        let registry = FilterRegistry::new();
        registry.register(vec![RequestFilter::with_payload("h", "/p", "GET", "ok")]);
        let interceptor = MockInterceptor::new(registry);

        assert!(interceptor.can_handle(&MockRequest::new("GET", "h", "/p")));
        assert!(!interceptor.can_handle(&MockRequest::new("GET", "h", "/q")));
    }

    #[test]
    fn test_can_handle_does_not_invoke_generator() {
        let registry = FilterRegistry::new();
        registry.register(vec![RequestFilter::with_generator(
            "h",
            "/p",
            "GET",
            |filter, _| Ok(Payload::from(json!(filter.state().increment("calls")))),
        )]);
        let interceptor = MockInterceptor::new(registry.clone());
        let request = MockRequest::new("GET", "h", "/p");

        for _ in 0..3 {
            assert!(interceptor.can_handle(&request));
        }
        assert!(registry.filters()[0].state().is_empty());

        let response = interceptor.handle(&request).unwrap();
        assert_eq!(response.body_str(), Some("1"));
    }

    #[test]
    fn test_handle_equivalent_to_resolve() {
        let registry = FilterRegistry::new();
        registry.register(vec![RequestFilter::with_payload(
            "api.example.com",
            "/login",
            "POST",
            json!({"token": "abc"}),
        )]);
        let interceptor = MockInterceptor::new(registry);
        let request = MockRequest::new("POST", "api.example.com", "/login");

        let handled = interceptor.handle(&request).unwrap();
        let resolved = interceptor.resolver().resolve(&request).unwrap().unwrap();
        assert_eq!(handled, resolved);
    }

    #[test]
    fn test_handle_without_match_reports_unhandled() {
        let interceptor = MockInterceptor::new(FilterRegistry::new());
        let err = interceptor
            .handle(&MockRequest::new("GET", "h", "/p"))
            .unwrap_err();
        assert!(matches!(err, MockerError::Unhandled { .. }));
    }

    #[test]
    fn test_usable_as_trait_object() {
        let registry = FilterRegistry::new();
        registry.register(vec![RequestFilter::with_payload("h", "/p", "GET", "ok")]);
        let interceptor: Arc<dyn RequestInterceptor> = Arc::new(MockInterceptor::new(registry));

        let request = MockRequest::new("GET", "h", "/p");
        assert!(interceptor.can_handle(&request));
        assert_eq!(interceptor.handle(&request).unwrap().body_str(), Some("ok"));
    }
}
