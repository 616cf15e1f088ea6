//! The listener's concurrently running unit of work.

use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::net::listener::ListenerError;

/// A spawned accept loop together with the token that asks it to stop.
///
/// The loop receives the token when spawned and must return once it is
/// cancelled and its connections are done. Returning for any other reason
/// is treated as a fault.
#[derive(Debug)]
pub struct ListenerTask {
    handle: JoinHandle<Result<(), ListenerError>>,
    stop: CancellationToken,
}

impl ListenerTask {
    /// Spawn `run` onto the runtime, handing it a fresh stop token.
    pub fn spawn<F, Fut>(run: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<(), ListenerError>> + Send + 'static,
    {
        let stop = CancellationToken::new();
        let handle = tokio::spawn(run(stop.clone()));
        Self { handle, stop }
    }

    /// A clone of the stop token, for observing whether a stop was requested.
    pub fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }

    /// Ask the loop to stop accepting and drain. Idempotent.
    pub(crate) fn request_stop(&self) {
        self.stop.cancel();
    }

    /// Cancel the task outright, dropping every in-flight connection it owns.
    pub(crate) fn abort(&self) {
        self.handle.abort();
    }

    /// Wait for the task to end. Cancel safe: dropping the returned future
    /// leaves the task running and joinable again.
    pub(crate) async fn join(&mut self) -> Result<(), ListenerError> {
        match (&mut self.handle).await {
            Ok(result) => result,
            Err(err) if err.is_panic() => Err(ListenerError::Panicked(err.to_string())),
            Err(_) => Err(ListenerError::Aborted),
        }
    }
}
