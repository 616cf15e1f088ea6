//! Termination request shared between signal handling and the coordinator.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

/// A one-shot request to shut the daemon down.
///
/// Cloning shares the same request. Any number of triggers collapse into
/// a single wake of everyone waiting on [`Termination::requested`].
#[derive(Debug, Clone, Default)]
pub struct Termination {
    token: CancellationToken,
    fired: Arc<AtomicBool>,
}

impl Termination {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request termination. Returns `true` only for the first call.
    pub fn trigger(&self) -> bool {
        let first = !self.fired.swap(true, Ordering::SeqCst);
        self.token.cancel();
        first
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolve once termination has been requested.
    pub async fn requested(&self) {
        self.token.cancelled().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_only_first_trigger_reports_true() {
        let termination = Termination::new();
        let other = termination.clone();

        assert!(!termination.is_triggered());
        assert!(other.trigger());
        assert!(!termination.trigger());
        assert!(!other.trigger());
        assert!(termination.is_triggered());
    }

    #[tokio::test]
    async fn test_requested_wakes_all_waiters() {
        let termination = Termination::new();
        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let t = termination.clone();
                tokio::spawn(async move { t.requested().await })
            })
            .collect();

        termination.trigger();
        for waiter in waiters {
            tokio::time::timeout(Duration::from_secs(1), waiter)
                .await
                .unwrap()
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_requested_after_trigger_is_immediate() {
        let termination = Termination::new();
        termination.trigger();
        termination.requested().await;
    }
}
