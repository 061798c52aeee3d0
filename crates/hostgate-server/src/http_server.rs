//! Listener / dispatch loop
//!
//! [`HttpServer`] accepts connections from one or more bound sockets and
//! handles them strictly one after another on the calling task:
//!
//! 1. Wait for the next connection on any listener
//! 2. Serve exactly one HTTP/1.1 request on it (keep-alive is off)
//! 3. Classify the request with the [`Router`]
//! 4. For Execute requests, submit through the [`HostProxy`] and wait
//! 5. Write the fixed-shape JSON response and close the connection
//!
//! There is no per-connection task fan-out. The host can only do one thing
//! at a time, so connections queue in the OS backlog while a script runs.
//!
//! # Shutdown
//!
//! A request to `/exit` gets its success response first; the loop then
//! returns instead of accepting again. Connections never accepted are left
//! to the caller, who drops the listeners.
//!
//! # Error Isolation
//!
//! Failures while serving a connection (bad body, broken socket, oversized
//! request) are logged, forwarded to the host's emit sink, and the loop moves
//! on to the next connection.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::select_all;
use hostgate_common::protocol::error::GatewayError;
use hostgate_common::transport::{HttpTransport, HyperRequest, HyperResponse};
use hostgate_common::ExecutionResult;
use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use tokio::net::{TcpListener, TcpStream};

use crate::http_router::{IncomingRequest, Operation, Router};
use crate::runtime::HostProxy;

/// How long a client may take to send its request headers.
const HEADER_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Pause after a failed `accept` so a persistent error does not spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// The serial HTTP front-end for one host.
pub struct HttpServer {
    proxy: HostProxy,
    max_body_bytes: usize,
}

impl HttpServer {
    /// Creates a server that dispatches Execute requests to `proxy` and
    /// rejects bodies larger than `max_body_bytes`.
    pub fn new(proxy: HostProxy, max_body_bytes: usize) -> Self {
        Self {
            proxy,
            max_body_bytes,
        }
    }

    /// Accepts and serves connections until a shutdown request arrives.
    ///
    /// Returns immediately if `listeners` is empty.
    pub async fn serve(&self, listeners: &[TcpListener]) {
        if listeners.is_empty() {
            return;
        }

        loop {
            let accepts = listeners.iter().map(|listener| Box::pin(listener.accept()));
            let (accepted, _, _) = select_all(accepts).await;

            let (stream, peer) = match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    tracing::error!("Failed to accept connection: {}", e);
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            };

            if self.serve_connection(stream, peer).await {
                tracing::info!("Shutdown requested by {}, no longer accepting connections", peer);
                return;
            }
        }
    }

    /// Serves a single request on `stream`. Returns true if it asked the
    /// listener to stop.
    async fn serve_connection(&self, stream: TcpStream, peer: SocketAddr) -> bool {
        tracing::debug!("Connection established from {}", peer);

        let stop = Arc::new(AtomicBool::new(false));
        let io = TokioIo::new(stream);

        let service = {
            let stop = stop.clone();
            service_fn(move |req| {
                let stop = stop.clone();
                async move { Ok::<_, Infallible>(self.handle_request(req, &stop).await) }
            })
        };

        if let Err(err) = http1::Builder::new()
            .keep_alive(false)
            .timer(TokioTimer::new())
            .header_read_timeout(HEADER_READ_TIMEOUT)
            .serve_connection(io, service)
            .await
        {
            self.report(format!("Error serving connection from {}: {}", peer, err));
        }

        stop.load(Ordering::SeqCst)
    }

    /// Handles one HTTP request.
    async fn handle_request(&self, req: HyperRequest, stop: &AtomicBool) -> HyperResponse {
        let result = self.dispatch(req, stop).await;
        HttpTransport::to_http_response(&result)
    }

    async fn dispatch(&self, req: HyperRequest, stop: &AtomicBool) -> ExecutionResult {
        let path = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());

        tracing::debug!("{} {}", req.method(), path);

        let incoming = if Router::is_control_path(&path) {
            IncomingRequest::new(path, Bytes::new(), None)
        } else {
            let content_type = HttpTransport::content_type(req.headers()).map(str::to_owned);
            match HttpTransport::read_body(req.into_body(), self.max_body_bytes).await {
                Ok(body) => IncomingRequest::new(path, body, content_type.as_deref()),
                Err(err) => {
                    self.report(format!("Rejected request to {}: {}", path, err));
                    return match err {
                        GatewayError::PayloadTooLarge { limit } => {
                            ExecutionResult::payload_too_large(limit)
                        }
                        other => ExecutionResult::bad_request(other.to_string()),
                    };
                }
            }
        };

        match Router::classify(&incoming) {
            Operation::HealthCheck => ExecutionResult::healthy(),
            Operation::Shutdown => {
                stop.store(true, Ordering::SeqCst);
                ExecutionResult::stopped()
            }
            Operation::Execute(request) => self.proxy.submit_async(request).await,
        }
    }

    /// Logs a per-connection failure and shows it on the host.
    fn report(&self, message: String) {
        tracing::warn!("{}", message);
        self.proxy.emit(message);
    }
}
