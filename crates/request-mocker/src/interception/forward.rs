//! Fall-through handling for requests no filter matches.
//!
//! The engine only reports "not mine"; what happens next is the hook's
//! choice. `Reject` answers locally, `Forward` sends the request on to a real
//! server and relays its answer.

use crate::filter::MockRequest;
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Header set on locally rejected responses
pub const UNHANDLED_HEADER: &str = "x-mocker-unhandled";

/// Header stamped on forwarded requests; a listener seeing it again will not
/// forward a second time
pub const FORWARDED_HEADER: &str = "x-mocker-forwarded";

/// Global HTTP client for forwarded requests
static HTTP_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

fn get_http_client() -> Result<&'static reqwest::Client, reqwest::Error> {
    if let Some(client) = HTTP_CLIENT.get() {
        return Ok(client);
    }
    // The listener itself is often the client's configured proxy
    let client = reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(30))
        .pool_max_idle_per_host(0) // Disable connection pooling to avoid stale connections
        .build()?;
    Ok(HTTP_CLIENT.get_or_init(|| client))
}

/// Where unhandled requests go
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Fallthrough {
    /// Answer with `501 Not Implemented` and an `x-mocker-unhandled` header
    #[default]
    Reject,
    /// Re-issue the request against the host it was addressed to
    ForwardToHost { scheme: String },
    /// Re-issue the request against a fixed base URL, e.g. `http://127.0.0.1:9000`
    ForwardTo { base_url: String },
}

impl Fallthrough {
    /// Build the response for an unhandled request.
    ///
    /// A request that was already forwarded once is answered with
    /// `508 Loop Detected` instead of being forwarded again.
    pub async fn respond(&self, request: &MockRequest) -> Response<Full<Bytes>> {
        match self {
            Fallthrough::Reject => {
                debug!(
                    "Rejecting unhandled request {} {}{}",
                    request.method, request.host, request.path
                );
                unhandled_response(
                    StatusCode::NOT_IMPLEMENTED,
                    &format!(
                        "No filter matches {} {}{}",
                        request.method, request.host, request.path
                    ),
                )
            }
            _ if request.header(FORWARDED_HEADER).is_some() => {
                warn!(
                    "Refusing to forward {} {}{} again: forwarding loop",
                    request.method, request.host, request.path
                );
                unhandled_response(
                    StatusCode::LOOP_DETECTED,
                    &format!(
                        "Forwarding loop for {} {}{}",
                        request.method, request.host, request.path
                    ),
                )
            }
            Fallthrough::ForwardToHost { scheme } => {
                // The Host header keeps the port that MockRequest::host drops
                let authority = request.header("host").unwrap_or(&request.host);
                let url = upstream_url(&format!("{scheme}://{authority}"), request);
                forward(request, &url).await
            }
            Fallthrough::ForwardTo { base_url } => {
                let url = upstream_url(base_url, request);
                forward(request, &url).await
            }
        }
    }
}

fn unhandled_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let mut response = error_response(status, message);
    response
        .headers_mut()
        .insert(UNHANDLED_HEADER, hyper::header::HeaderValue::from_static("true"));
    response
}

fn upstream_url(base_url: &str, request: &MockRequest) -> String {
    let base = base_url.trim_end_matches('/');
    match &request.query {
        Some(query) if !query.is_empty() => format!("{base}{}?{query}", request.path),
        _ => format!("{base}{}", request.path),
    }
}

async fn forward(request: &MockRequest, url: &str) -> Response<Full<Bytes>> {
    match send_upstream(request, url).await {
        Ok(response) => response,
        Err(e) => {
            error!("Failed to forward {} {}: {}", request.method, url, e);
            error_response(StatusCode::BAD_GATEWAY, &format!("Upstream error: {e}"))
        }
    }
}

async fn send_upstream(
    request: &MockRequest,
    url: &str,
) -> anyhow::Result<Response<Full<Bytes>>> {
    let method = reqwest::Method::from_bytes(request.method.as_bytes())?;
    let client = get_http_client()?;

    let mut builder = client.request(method, url);
    for (key, value) in &request.headers {
        if is_hop_by_hop(key) || key.eq_ignore_ascii_case("host") {
            continue;
        }
        builder = builder.header(key.as_str(), value.as_str());
    }
    builder = builder.header(FORWARDED_HEADER, "true");
    if let Some(body) = &request.body {
        builder = builder.body(body.clone());
    }

    debug!("Forwarding unhandled request {} {}", request.method, url);
    let upstream = builder.send().await?;

    let status = upstream.status();
    let headers = upstream.headers().clone();
    let body = upstream.bytes().await?;

    let mut response = Response::new(Full::new(body));
    *response.status_mut() = StatusCode::from_u16(status.as_u16())?;
    for (name, value) in headers.iter() {
        if !is_hop_by_hop(name.as_str()) && name != hyper::header::CONTENT_LENGTH {
            response.headers_mut().append(name.clone(), value.clone());
        }
    }
    Ok(response)
}

fn is_hop_by_hop(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    name == "transfer-encoding" || name == "connection" || name == "keep-alive"
}

/// JSON error body with the given status
pub(crate) fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({ "error": message }).to_string();
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static("application/json"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn test_upstream_url() {
        let request = MockRequest::new("GET", "h", "/users").with_query("page=2");
        assert_eq!(
            upstream_url("http://127.0.0.1:9000/", &request),
            "http://127.0.0.1:9000/users?page=2"
        );

        let request = MockRequest::new("GET", "h", "/users");
        assert_eq!(
            upstream_url("http://127.0.0.1:9000", &request),
            "http://127.0.0.1:9000/users"
        );
    }

    #[test]
    fn test_is_hop_by_hop() {
        assert!(is_hop_by_hop("Connection"));
        assert!(is_hop_by_hop("transfer-encoding"));
        assert!(!is_hop_by_hop("content-type"));
    }

    #[test]
    fn test_error_response() {
        let response = error_response(StatusCode::BAD_GATEWAY, "Bad Gateway");
        assert_eq!(response.status(), 502);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json"
        );
    }

    #[tokio::test]
    async fn test_reject_marks_response_unhandled() {
        let response = Fallthrough::Reject
            .respond(&MockRequest::new("GET", "h", "/missing"))
            .await;

        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
        assert_eq!(response.headers().get(UNHANDLED_HEADER).unwrap(), "true");

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "No filter matches GET h/missing");
    }

    #[tokio::test]
    async fn test_already_forwarded_request_is_not_forwarded_again() {
        for fallthrough in [
            Fallthrough::ForwardToHost {
                scheme: "http".to_string(),
            },
            Fallthrough::ForwardTo {
                base_url: "http://127.0.0.1:9".to_string(),
            },
        ] {
            let request = MockRequest::new("GET", "127.0.0.1", "/missing")
                .with_header("host", "127.0.0.1:9")
                .with_header(FORWARDED_HEADER, "true");
            let response = fallthrough.respond(&request).await;

            assert_eq!(response.status(), StatusCode::LOOP_DETECTED);
            assert_eq!(response.headers().get(UNHANDLED_HEADER).unwrap(), "true");
        }
    }

    #[tokio::test]
    async fn test_forward_failure_is_bad_gateway() {
        // Port 9 (discard) on loopback is expected to refuse connections
        let fallthrough = Fallthrough::ForwardTo {
            base_url: "http://127.0.0.1:9".to_string(),
        };
        let response = fallthrough
            .respond(&MockRequest::new("GET", "127.0.0.1", "/x"))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
