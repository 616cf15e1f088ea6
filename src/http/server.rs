//! HTTP server setup and the accept loop.
//!
//! # Responsibilities
//! - Wrap the application router with per-request middleware
//!   (response deadline, tracing, request ID)
//! - Serve every accepted connection with HTTP/1.1, enforcing the header
//!   read timeout and header size limit
//! - Stop accepting on request and drain open connections
//!
//! # Design Decisions
//! - Connection tasks live in a `JoinSet` owned by `serve`, so aborting the
//!   listener task tears down every in-flight connection with it
//! - Only accept errors the loop cannot recover from end `serve` with an error

use axum::http::StatusCode;
use axum::Router;
use hyper::server::conn::http1;
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::server::graceful::GracefulShutdown;
use hyper_util::service::TowerToHyperService;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::schema::{ListenerConfig, MIN_HEADER_BYTES};
use crate::http::request;
use crate::net::backoff::AcceptBackoff;
use crate::net::connection::ConnectionTracker;
use crate::net::listener::{AcceptErrorKind, Listener, ListenerError};
use crate::observability::metrics;

/// HTTP server for the daemon's single listening endpoint.
pub struct HttpServer {
    app: Router,
    builder: http1::Builder,
}

impl HttpServer {
    /// Create a server that hands requests to `routes`.
    pub fn new(config: &ListenerConfig, routes: Router) -> Self {
        let mut builder = http1::Builder::new();
        builder
            .timer(TokioTimer::new())
            .header_read_timeout(config.read_timeout())
            .max_buf_size(config.max_header_bytes.max(MIN_HEADER_BYTES));

        Self {
            app: Self::build_router(config, routes),
            builder,
        }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// The write deadline covers producing the response head; a body still
    /// streaming after that is not bounded by it.
    fn build_router(config: &ListenerConfig, routes: Router) -> Router {
        routes
            .layer(TimeoutLayer::with_status_code(
                StatusCode::SERVICE_UNAVAILABLE,
                config.write_timeout(),
            ))
            .layer(TraceLayer::new_for_http())
            .layer(request::propagate_request_id_layer())
            .layer(request::set_request_id_layer())
    }

    /// Run the accept loop until `stop` is cancelled, then drain.
    ///
    /// Returns `Ok(())` only after a requested stop once every open
    /// connection has finished. The caller bounds the drain.
    pub async fn serve(self, listener: Listener, stop: CancellationToken) -> Result<(), ListenerError> {
        let local_addr = listener.local_addr().map_err(ListenerError::Accept)?;
        tracing::info!(address = %local_addr, "HTTP server accepting connections");

        let graceful = GracefulShutdown::new();
        let tracker = ConnectionTracker::new();
        let mut connections = JoinSet::new();
        let mut backoff = AcceptBackoff::default();

        loop {
            let accepted = tokio::select! {
                biased;
                _ = stop.cancelled() => break,
                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    log_join(joined);
                    continue;
                }
                accepted = listener.accept() => accepted,
            };

            let (stream, peer_addr, permit) = match accepted {
                Ok(accepted) => {
                    backoff.reset();
                    accepted
                }
                Err(err) => {
                    let kind = AcceptErrorKind::classify(&err);
                    metrics::record_accept_error(kind.as_str());
                    match kind {
                        AcceptErrorKind::Connection => {
                            tracing::debug!(error = %err, "Peer went away before accept");
                            continue;
                        }
                        AcceptErrorKind::Exhausted => {
                            let delay = backoff.next_delay();
                            tracing::warn!(error = %err, delay = ?delay, "Accept failed, retrying after backoff");
                            tokio::select! {
                                _ = stop.cancelled() => break,
                                _ = tokio::time::sleep(delay) => continue,
                            }
                        }
                        AcceptErrorKind::Fatal => {
                            tracing::error!(address = %local_addr, error = %err, "Accept failed");
                            return Err(ListenerError::Accept(err));
                        }
                    }
                }
            };

            metrics::record_connection_accepted();
            let guard = tracker.track();
            let service = TowerToHyperService::new(self.app.clone());
            let connection =
                graceful.watch(self.builder.serve_connection(TokioIo::new(stream), service));

            connections.spawn(async move {
                let _permit = permit;
                if let Err(err) = connection.await {
                    tracing::debug!(
                        connection_id = %guard.id(),
                        peer_addr = %peer_addr,
                        error = %err,
                        "Connection ended with error"
                    );
                }
                drop(guard);
            });
        }

        drop(listener);
        tracing::info!(
            address = %local_addr,
            active_connections = tracker.active_count(),
            "Stopped accepting, draining connections"
        );

        graceful.shutdown().await;
        while let Some(joined) = connections.join_next().await {
            log_join(joined);
        }

        tracing::info!(address = %local_addr, "HTTP server stopped");
        Ok(())
    }
}

fn log_join(joined: Result<(), JoinError>) {
    if let Err(err) = joined {
        if err.is_panic() {
            tracing::warn!(error = %err, "Connection task panicked");
        }
    }
}
