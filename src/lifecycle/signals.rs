//! OS signal handling.
//!
//! # Responsibilities
//! - Register SIGINT and SIGTERM handlers once, at startup
//! - Trigger the shared [`Termination`] on the first one
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Registration is separate from watching, so a registration failure is a
//!   startup error raised before any listener task exists
//! - Signals after the first are logged and dropped; the watcher keeps its
//!   handlers installed so they never fall back to the default disposition

use std::io;

use tokio::task::JoinHandle;

use crate::lifecycle::shutdown::Termination;

/// Registered interrupt and termination handlers.
pub struct SignalWatcher {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl SignalWatcher {
    /// Register the handlers. Must be called inside the Tokio runtime.
    #[cfg(unix)]
    pub fn register() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    #[cfg(not(unix))]
    pub fn register() -> io::Result<Self> {
        Ok(Self {})
    }

    /// Start watching; the first signal triggers `termination`.
    pub fn spawn(self, termination: Termination) -> JoinHandle<()> {
        tokio::spawn(self.watch(termination))
    }

    async fn watch(mut self, termination: Termination) {
        while let Some(signal) = self.recv().await {
            if termination.is_triggered() {
                tracing::debug!(signal, "Shutdown already in progress, ignoring signal");
                continue;
            }
            tracing::info!(signal, "Shutdown signal received");
            termination.trigger();
        }
    }

    #[cfg(unix)]
    async fn recv(&mut self) -> Option<&'static str> {
        tokio::select! {
            received = self.interrupt.recv() => received.map(|_| "SIGINT"),
            received = self.terminate.recv() => received.map(|_| "SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    async fn recv(&mut self) -> Option<&'static str> {
        tokio::signal::ctrl_c().await.ok().map(|_| "ctrl-c")
    }
}
