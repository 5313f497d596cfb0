//! Error taxonomy for the mocking engine.
//!
//! A request that matches no filter is not an error: resolution reports it as
//! `Ok(None)` so the caller can let the request fall through.

/// Errors raised while building filters or resolving requests.
#[derive(Debug, thiserror::Error)]
pub enum MockerError {
    /// A filter was built without a static payload or a generator.
    #[error("Filter {method} {host}{path} has no payload source")]
    MissingPayloadSource {
        host: String,
        path: String,
        method: String,
    },
    /// A filter was built with both a static payload and a generator.
    #[error("Filter {method} {host}{path} has both a static payload and a generator")]
    ConflictingPayloadSources {
        host: String,
        path: String,
        method: String,
    },
    /// The payload generator of the matched filter failed.
    #[error("Payload generator for filter '{filter}' failed: {source}")]
    Generator {
        filter: String,
        #[source]
        source: anyhow::Error,
    },
    /// `handle` was called for a request no filter matches.
    #[error("No filter matches {method} {host}{path}")]
    Unhandled {
        host: String,
        path: String,
        method: String,
    },
    /// A synthesized response could not be expressed as an HTTP response.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    /// A declarative filter definition failed validation.
    #[error("Invalid filter definition at filters[{index}]: {reason}")]
    InvalidDefinition { index: usize, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_payload_message() {
        let err = MockerError::MissingPayloadSource {
            host: "api.example.com".to_string(),
            path: "/login".to_string(),
            method: "POST".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Filter POST api.example.com/login has no payload source"
        );
    }

    #[test]
    fn test_generator_error_keeps_source() {
        use std::error::Error;

        let err = MockerError::Generator {
            filter: "GET h /p".to_string(),
            source: anyhow::anyhow!("counter overflow"),
        };
        assert!(err.to_string().contains("counter overflow"));
        assert!(err.source().is_some());
    }
}
