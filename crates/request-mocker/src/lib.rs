//! Request-level HTTP mocking for tests.
//!
//! Tests register [`RequestFilter`]s describing which requests to intercept
//! (exact host, path and method) and what to answer with: a static payload or
//! one generated per request. A host hook (see [`interception`]) asks the
//! engine whether a request is handled and, if so, receives the synthesized
//! response without touching the network.
//!
//! ```no_run
//! use request_mocker::{register_filters, MockInterceptor, RequestFilter, RequestInterceptor, MockRequest};
//! use serde_json::json;
//!
//! register_filters(vec![RequestFilter::with_payload(
//!     "api.example.com",
//!     "/login",
//!     "POST",
//!     json!({"token": "abc"}),
//! )]);
//!
//! let interceptor = MockInterceptor::global();
//! let request = MockRequest::new("POST", "api.example.com", "/login");
//! assert!(interceptor.can_handle(&request));
//! let response = interceptor.handle(&request).unwrap();
//! assert_eq!(response.status_code, 200);
//! ```
//!
//! ## Module Structure
//!
//! - `filter`: filters, requests, payloads and per-filter state
//! - `registry`: the ordered, replace-on-register rule set
//! - `resolver`: turns a matched filter into a response
//! - `interception`: the `can_handle`/`handle` contract and a loopback hook
//! - `config`: filters declared in YAML or JSON files
//! - `metrics`: Prometheus counters for resolution outcomes

pub mod config;
pub mod error;
pub mod filter;
pub mod interception;
pub mod metrics;
pub mod registry;
pub mod resolver;
pub mod response;
pub mod telemetry;

pub use config::{FilterSpec, MockerConfig};
pub use error::MockerError;
pub use filter::{
    BodyMode, FilterState, MockRequest, Payload, PayloadGenerator, PayloadSource, RequestFilter,
    RequestFilterBuilder, ResponseDescriptor,
};
pub use interception::{Fallthrough, InterceptServer, MockInterceptor, RequestInterceptor};
pub use registry::{register_filters, FilterRegistry};
pub use resolver::ResponseResolver;
pub use response::MockResponse;
