//! Lifecycle coordination: race the listener against termination, then
//! take exactly one terminal path.
//!
//! # State Transitions
//! ```text
//! Starting → Running: run() entered (listener already spawned)
//! Running → Faulted: listener task ended first
//! Running → ShuttingDown: termination requested first
//! ShuttingDown → Closed: listener drained within the grace period
//! ShuttingDown → ForceClosed: grace period elapsed, listener aborted
//! ```
//!
//! # Ordering
//! - The resource is closed before the listener is asked to stop
//! - The resource is closed on the fault path too, and the listener is
//!   never asked to stop there
//! - The grace period is a single deadline on the stop request

use std::time::Duration;

use tokio::sync::watch;

use crate::lifecycle::closer::{Resource, ResourceCloser};
use crate::lifecycle::shutdown::Termination;
use crate::lifecycle::task::ListenerTask;
use crate::net::listener::ListenerError;
use crate::observability::metrics;

/// Exit status for a clean shutdown.
pub const EXIT_CLEAN: u8 = 0;
/// Exit status for a listener fault or a startup failure.
pub const EXIT_FAILURE: u8 = 1;

/// Where the coordinator is in the daemon's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Starting,
    Running,
    ShuttingDown,
    Closed,
    ForceClosed,
    Faulted,
}

impl LifecycleState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LifecycleState::Closed | LifecycleState::ForceClosed | LifecycleState::Faulted
        )
    }
}

/// Which event won the race in `Running`.
#[derive(Debug)]
pub enum Outcome {
    ListenerFault(ListenerError),
    ShutdownRequested,
}

/// How the coordinator finished.
#[derive(Debug)]
pub enum Exit {
    /// Listener drained within the grace period.
    Closed,
    /// Grace period elapsed and the listener was aborted.
    ForceClosed,
    /// The listener failed while running.
    Faulted(ListenerError),
}

impl Exit {
    /// Process exit status, with `force_close_code` used for `ForceClosed`.
    pub fn code(&self, force_close_code: u8) -> u8 {
        match self {
            Exit::Closed => EXIT_CLEAN,
            Exit::ForceClosed => force_close_code,
            Exit::Faulted(_) => EXIT_FAILURE,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Exit::Closed => "closed",
            Exit::ForceClosed => "force_closed",
            Exit::Faulted(_) => "faulted",
        }
    }
}

/// Drives one listener and one dependent resource to a terminal state.
pub struct Coordinator<R> {
    task: ListenerTask,
    closer: ResourceCloser<R>,
    termination: Termination,
    grace_period: Duration,
    state: watch::Sender<LifecycleState>,
}

impl<R: Resource> Coordinator<R> {
    pub fn new(
        task: ListenerTask,
        resource: R,
        termination: Termination,
        grace_period: Duration,
    ) -> Self {
        let (state, _) = watch::channel(LifecycleState::Starting);
        Self {
            task,
            closer: ResourceCloser::new(resource),
            termination,
            grace_period,
            state,
        }
    }

    /// Observe state transitions.
    pub fn state(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Block until the listener fails or termination is requested, then
    /// run the matching terminal path.
    pub async fn run(mut self) -> Exit {
        self.transition(LifecycleState::Running);

        let outcome = tokio::select! {
            result = self.task.join() => Outcome::ListenerFault(match result {
                Ok(()) => ListenerError::Exited,
                Err(err) => err,
            }),
            _ = self.termination.requested() => Outcome::ShutdownRequested,
        };

        let exit = match outcome {
            Outcome::ListenerFault(err) => self.fail(err).await,
            Outcome::ShutdownRequested => self.shut_down().await,
        };

        metrics::record_lifecycle_exit(exit.as_str());
        exit
    }

    async fn fail(&mut self, err: ListenerError) -> Exit {
        tracing::error!(error = %err, "Listener failed");
        self.transition(LifecycleState::Faulted);

        if let Err(e) = self.closer.close().await {
            tracing::warn!(error = %e, "Resource close failed after listener fault");
        }

        Exit::Faulted(err)
    }

    async fn shut_down(&mut self) -> Exit {
        self.transition(LifecycleState::ShuttingDown);
        tracing::info!(grace_period = ?self.grace_period, "Shutting down");

        if let Err(e) = self.closer.close().await {
            tracing::warn!(error = %e, "Resource close failed, continuing shutdown");
        }

        self.task.request_stop();

        match tokio::time::timeout(self.grace_period, self.task.join()).await {
            Ok(result) => {
                if let Err(e) = result {
                    tracing::error!(error = %e, "Listener reported an error while draining");
                }
                self.transition(LifecycleState::Closed);
                tracing::info!("Shutdown complete");
                Exit::Closed
            }
            Err(_) => {
                tracing::warn!(
                    grace_period = ?self.grace_period,
                    "Graceful shutdown did not complete in time, forcing listener closed"
                );
                self.task.abort();
                match self.task.join().await {
                    Err(ListenerError::Aborted) => {}
                    result => {
                        tracing::debug!(result = ?result, "Listener finished before the abort landed");
                    }
                }
                self.transition(LifecycleState::ForceClosed);
                Exit::ForceClosed
            }
        }
    }

    fn transition(&self, next: LifecycleState) {
        let previous = self.state.send_replace(next);
        tracing::debug!(from = ?previous, to = ?next, "Lifecycle transition");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(Exit::Closed.code(2), 0);
        assert_eq!(Exit::ForceClosed.code(2), 2);
        assert_eq!(Exit::ForceClosed.code(0), 0);
        assert_eq!(Exit::Faulted(ListenerError::Exited).code(2), 1);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!LifecycleState::Running.is_terminal());
        assert!(!LifecycleState::ShuttingDown.is_terminal());
        assert!(LifecycleState::Closed.is_terminal());
        assert!(LifecycleState::ForceClosed.is_terminal());
        assert!(LifecycleState::Faulted.is_terminal());
    }
}
