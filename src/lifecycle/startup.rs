//! Startup orchestration.
//!
//! # Responsibilities
//! - Open the storage connection
//! - Bind the listener
//! - Register signal handlers
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal and nothing is retried
//! - Nothing is spawned here; a failure leaves no listener task behind
//! - A storage handle opened before a later step fails is closed again

use thiserror::Error;

use crate::config::DaemonConfig;
use crate::lifecycle::closer::{Resource, ResourceCloser};
use crate::lifecycle::signals::SignalWatcher;
use crate::net::listener::{Listener, ListenerError};
use crate::storage::{StorageError, StorageHandle};

/// Errors that prevent the daemon from reaching `Running`.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to open storage: {0}")]
    Storage(#[from] StorageError),

    #[error("failed to start listener: {0}")]
    Listener(#[from] ListenerError),

    #[error("failed to register signal handlers: {0}")]
    Signals(#[source] std::io::Error),
}

/// Everything the coordinator needs, ready but not yet running.
pub struct Started<R> {
    pub listener: Listener,
    pub resource: R,
    pub signals: SignalWatcher,
}

/// Open storage, bind the listener and register signal handlers, in order.
pub async fn start(config: &DaemonConfig) -> Result<Started<StorageHandle>, StartupError> {
    let storage = StorageHandle::connect(&config.storage).await?;
    prepare(config, storage).await
}

/// Bind the listener and register signal handlers for an already opened
/// resource. The resource is closed if either step fails.
pub async fn prepare<R: Resource>(
    config: &DaemonConfig,
    resource: R,
) -> Result<Started<R>, StartupError> {
    let prepared = async {
        let listener = Listener::bind(&config.listener).await?;
        let signals = SignalWatcher::register().map_err(StartupError::Signals)?;
        Ok::<_, StartupError>((listener, signals))
    }
    .await;

    match prepared {
        Ok((listener, signals)) => Ok(Started {
            listener,
            resource,
            signals,
        }),
        Err(e) => {
            // Close failures are logged by the closer; the startup error wins.
            let _ = ResourceCloser::new(resource).close().await;
            Err(e)
        }
    }
}
