//! TCP listener implementation with backpressure.
//!
//! # Responsibilities
//! - Bind to configured address
//! - Accept incoming TCP connections
//! - Enforce max_connections limit via semaphore
//! - Classify accept errors into skippable, retryable and fatal

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

use crate::config::ListenerConfig;

/// Error type for listener operations.
///
/// Everything except `Bind` is a fatal fault of a running listener.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    Bind(#[source] io::Error),

    /// Accepting failed in a way that retrying cannot fix.
    #[error("Failed to accept: {0}")]
    Accept(#[source] io::Error),

    /// The accept loop returned without being asked to stop.
    #[error("Accept loop exited without a stop request")]
    Exited,

    /// The listener task panicked.
    #[error("Listener task panicked: {0}")]
    Panicked(String),

    /// The listener task was cancelled from outside.
    #[error("Listener task was aborted")]
    Aborted,
}

/// How the accept loop should react to an accept error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptErrorKind {
    /// The peer went away before we accepted it; skip it.
    Connection,
    /// Out of descriptors or memory; back off and try again.
    Exhausted,
    /// Anything else ends the listener.
    Fatal,
}

impl AcceptErrorKind {
    pub fn classify(err: &io::Error) -> Self {
        // ENFILE (23) and EMFILE (24) share values across Linux and the BSDs.
        const ENFILE: i32 = 23;
        const EMFILE: i32 = 24;

        match err.kind() {
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset => AcceptErrorKind::Connection,
            io::ErrorKind::OutOfMemory => AcceptErrorKind::Exhausted,
            _ if matches!(err.raw_os_error(), Some(ENFILE) | Some(EMFILE)) => {
                AcceptErrorKind::Exhausted
            }
            _ => AcceptErrorKind::Fatal,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AcceptErrorKind::Connection => "connection",
            AcceptErrorKind::Exhausted => "exhausted",
            AcceptErrorKind::Fatal => "fatal",
        }
    }
}

/// A bounded TCP listener that limits concurrent connections.
///
/// Uses a semaphore to enforce `max_connections`. When the limit is reached,
/// new connections will wait until a slot becomes available.
pub struct Listener {
    /// The underlying TCP listener.
    inner: TcpListener,
    /// Semaphore to limit concurrent connections.
    connection_limit: Arc<Semaphore>,
    /// Configured maximum connections.
    max_connections: usize,
}

impl Listener {
    /// Bind to the configured address with connection limits.
    pub async fn bind(config: &ListenerConfig) -> Result<Self, ListenerError> {
        let addr: SocketAddr = config
            .bind_address
            .parse()
            .map_err(|e| ListenerError::Bind(io::Error::new(io::ErrorKind::InvalidInput, e)))?;

        let listener = TcpListener::bind(addr).await.map_err(ListenerError::Bind)?;

        let local_addr = listener.local_addr().map_err(ListenerError::Bind)?;

        tracing::info!(
            address = %local_addr,
            max_connections = config.max_connections,
            "Listener bound"
        );

        Ok(Self {
            inner: listener,
            connection_limit: Arc::new(Semaphore::new(config.max_connections)),
            max_connections: config.max_connections,
        })
    }

    /// Accept a new connection, respecting the connection limit.
    ///
    /// This will wait if the connection limit has been reached.
    /// Returns the stream and a permit that must be held for the connection's lifetime.
    /// Cancel safe.
    pub async fn accept(&self) -> io::Result<(TcpStream, SocketAddr, ConnectionPermit)> {
        // Acquire permit first (backpressure)
        let permit = self
            .connection_limit
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| io::Error::other("connection limit semaphore closed"))?;

        // Then accept the connection
        let (stream, addr) = self.inner.accept().await?;

        tracing::debug!(
            peer_addr = %addr,
            available_permits = self.connection_limit.available_permits(),
            "Connection accepted"
        );

        Ok((stream, addr, ConnectionPermit { _permit: permit }))
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }

    /// Get current available connection slots.
    pub fn available_permits(&self) -> usize {
        self.connection_limit.available_permits()
    }

    /// Get configured maximum connections.
    pub fn max_connections(&self) -> usize {
        self.max_connections
    }
}

/// A permit representing a connection slot.
///
/// When dropped, the connection slot is released back to the pool.
/// This ensures backpressure is maintained even if the connection handler panics.
#[derive(Debug)]
pub struct ConnectionPermit {
    _permit: tokio::sync::OwnedSemaphorePermit,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_config(max_connections: usize) -> ListenerConfig {
        ListenerConfig {
            bind_address: "127.0.0.1:0".into(),
            max_connections,
            ..ListenerConfig::default()
        }
    }

    #[test]
    fn test_classify_accept_errors() {
        let reset = io::Error::from(io::ErrorKind::ConnectionReset);
        assert_eq!(AcceptErrorKind::classify(&reset), AcceptErrorKind::Connection);

        let emfile = io::Error::from_raw_os_error(24);
        assert_eq!(AcceptErrorKind::classify(&emfile), AcceptErrorKind::Exhausted);

        let other = io::Error::other("listener socket invalidated");
        assert_eq!(AcceptErrorKind::classify(&other), AcceptErrorKind::Fatal);
    }

    #[tokio::test]
    async fn test_bind_rejects_malformed_address() {
        let mut config = local_config(1);
        config.bind_address = "localhost".into();
        assert!(matches!(Listener::bind(&config).await, Err(ListenerError::Bind(_))));
    }

    #[tokio::test]
    async fn test_bind_fails_when_address_in_use() {
        let first = Listener::bind(&local_config(1)).await.unwrap();
        let mut config = local_config(1);
        config.bind_address = first.local_addr().unwrap().to_string();

        let err = Listener::bind(&config).await.err().unwrap();
        assert!(matches!(err, ListenerError::Bind(_)));
        assert!(err.to_string().starts_with("Failed to bind"));
    }

    #[tokio::test]
    async fn test_permit_released_on_drop() {
        let listener = Listener::bind(&local_config(2)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        assert_eq!(listener.max_connections(), 2);

        let _client = TcpStream::connect(addr).await.unwrap();
        let (_stream, _peer, permit) = listener.accept().await.unwrap();
        assert_eq!(listener.available_permits(), 1);

        drop(permit);
        assert_eq!(listener.available_permits(), 2);
    }
}
