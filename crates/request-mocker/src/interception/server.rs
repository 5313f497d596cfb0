//! Loopback HTTP/1 listener that routes requests through a [`RequestInterceptor`].
//!
//! Point a client under test at [`InterceptServer::url`] (or use it as the
//! client's HTTP proxy) and every request it sends is answered by the
//! registered filters, or by the configured [`Fallthrough`].

use super::forward::{error_response, Fallthrough};
use super::RequestInterceptor;
use crate::filter::MockRequest;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode, Version};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Running interception listener.
///
/// Dropping the server stops accepting new connections.
pub struct InterceptServer {
    local_addr: SocketAddr,
    shutdown_tx: broadcast::Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl InterceptServer {
    /// Bind `addr` and start serving in the background.
    ///
    /// Use port 0 to let the OS pick a free port.
    pub async fn bind<A: ToSocketAddrs>(
        addr: A,
        interceptor: Arc<dyn RequestInterceptor>,
        fallthrough: Fallthrough,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
        let fallthrough = Arc::new(fallthrough);

        info!("Interception listener bound to {}", local_addr);

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, _addr)) => {
                                let interceptor = Arc::clone(&interceptor);
                                let fallthrough = Arc::clone(&fallthrough);
                                tokio::spawn(async move {
                                    let io = TokioIo::new(stream);
                                    let service = service_fn(move |req| {
                                        let interceptor = Arc::clone(&interceptor);
                                        let fallthrough = Arc::clone(&fallthrough);
                                        async move {
                                            handle_intercepted_request(req, interceptor, fallthrough)
                                                .await
                                        }
                                    });
                                    if let Err(e) = http1::Builder::new()
                                        .serve_connection(io, service)
                                        .await
                                    {
                                        debug!("Connection error on {}: {}", local_addr, e);
                                    }
                                });
                            }
                            Err(e) => {
                                error!("Accept error on {}: {}", local_addr, e);
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Interception listener on {} shutting down", local_addr);
                        break;
                    }
                }
            }
        });

        Ok(Self {
            local_addr,
            shutdown_tx,
            handle: Some(handle),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Base URL of the listener, e.g. `http://127.0.0.1:49152`
    pub fn url(&self) -> String {
        format!("http://{}", self.local_addr)
    }

    /// Stop accepting connections and wait for the accept loop to exit
    pub async fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for InterceptServer {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// Handle one request arriving at the listener
async fn handle_intercepted_request(
    req: Request<Incoming>,
    interceptor: Arc<dyn RequestInterceptor>,
    fallthrough: Arc<Fallthrough>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => Some(collected.to_bytes()),
        Err(e) => {
            debug!("Failed to read request body: {}", e);
            None
        }
    };
    let request = MockRequest::from_parts(&parts, body);

    if !interceptor.can_handle(&request) {
        return Ok(fallthrough.respond(&request).await);
    }

    let response = interceptor
        .handle(&request)
        .and_then(|response| response.into_hyper());

    match response {
        Ok(mut response) => {
            // The HTTP/1 connection can only write 1.0 or 1.1 status lines
            if response.version() != Version::HTTP_10 {
                *response.version_mut() = Version::HTTP_11;
            }
            Ok(response)
        }
        Err(e) => {
            error!(
                "Failed to produce mock response for {} {}{}: {}",
                request.method, request.host, request.path, e
            );
            Ok(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &e.to_string(),
            ))
        }
    }
}
