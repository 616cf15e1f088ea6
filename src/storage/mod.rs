//! Storage connection handle.
//!
//! Opening the connection happens once at startup; afterwards the handle is
//! owned by the lifecycle coordinator, whose only use for it is closing it.

use std::io;
use std::time::Duration;

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use crate::config::StorageConfig;
use crate::lifecycle::closer::{Resource, ResourceError};

/// Errors opening the storage connection.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("connecting to {address} timed out after {timeout:?}")]
    Timeout { address: String, timeout: Duration },
}

/// An open (or deliberately absent) storage connection.
#[derive(Debug)]
pub struct StorageHandle {
    stream: Option<TcpStream>,
    address: Option<String>,
    close_timeout: Duration,
}

impl StorageHandle {
    /// Connect to `config.address`, or return a detached handle when no
    /// address is configured.
    pub async fn connect(config: &StorageConfig) -> Result<Self, StorageError> {
        let Some(address) = config.address.clone() else {
            tracing::info!("No storage address configured, running without storage");
            return Ok(Self::detached());
        };

        let timeout = config.connect_timeout();
        let connected = tokio::time::timeout(timeout, TcpStream::connect(address.as_str())).await;
        let stream = match connected {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => return Err(StorageError::Connect { address, source }),
            Err(_) => return Err(StorageError::Timeout { address, timeout }),
        };

        tracing::info!(address = %address, "Storage connection established");

        Ok(Self {
            stream: Some(stream),
            address: Some(address),
            close_timeout: config.close_timeout(),
        })
    }

    /// A handle with nothing behind it; closing it does nothing.
    pub fn detached() -> Self {
        Self {
            stream: None,
            address: None,
            close_timeout: Duration::ZERO,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }
}

impl Resource for StorageHandle {
    fn name(&self) -> &str {
        "storage"
    }

    async fn close(self) -> Result<(), ResourceError> {
        let Self {
            stream,
            close_timeout,
            ..
        } = self;

        let Some(mut stream) = stream else {
            return Ok(());
        };

        match tokio::time::timeout(close_timeout, stream.shutdown()).await {
            Ok(result) => result.map_err(ResourceError::Io),
            Err(_) => Err(ResourceError::Timeout(close_timeout)),
        }
    }
}
