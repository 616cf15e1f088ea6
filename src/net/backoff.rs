//! Exponential backoff with jitter.

use std::time::Duration;
use rand::Rng;

/// Calculate exponential backoff delay with jitter.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    let capped_delay = delay_ms.min(max_ms);

    // Apply jitter (0 to 10% of the delay)
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}

/// Backoff state for an accept loop that hit resource exhaustion.
///
/// Starts at 5ms and doubles up to 1s; reset after a successful accept.
#[derive(Debug, Default)]
pub struct AcceptBackoff {
    attempt: u32,
}

impl AcceptBackoff {
    const BASE_MS: u64 = 5;
    const MAX_MS: u64 = 1000;

    /// Delay before the next accept attempt.
    pub fn next_delay(&mut self) -> Duration {
        self.attempt = self.attempt.saturating_add(1);
        calculate_backoff(self.attempt, Self::BASE_MS, Self::MAX_MS)
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}
