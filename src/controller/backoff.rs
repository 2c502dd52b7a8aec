//! # Fibonacci Backoff
//!
//! Progressive retry delay for Installations whose reconciliation keeps failing.
//! Grows more slowly than exponential backoff so a flapping provisioning
//! backend is retried often enough to notice recovery.
//!
//! Sequence with the controller defaults: 1m, 1m, 2m, 3m, 5m, 8m, 10m, 10m, ...

use std::time::Duration;

/// Fibonacci backoff calculator, stepping in whole minutes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FibonacciBackoff {
    min_minutes: u64,
    max_minutes: u64,
    prev_minutes: u64,
    current_minutes: u64,
}

impl FibonacciBackoff {
    /// `min_minutes` is used for the first two steps, `max_minutes` caps the sequence
    #[must_use]
    pub fn new(min_minutes: u64, max_minutes: u64) -> Self {
        let min_minutes = min_minutes.max(1);
        Self {
            min_minutes,
            max_minutes: max_minutes.max(min_minutes),
            prev_minutes: 0,
            current_minutes: min_minutes,
        }
    }

    /// Return the current delay and advance the sequence
    pub fn next_backoff(&mut self) -> Duration {
        let delay = Duration::from_secs(self.current_minutes * 60);
        let next = self.prev_minutes.saturating_add(self.current_minutes);
        self.prev_minutes = self.current_minutes;
        self.current_minutes = next.min(self.max_minutes);
        delay
    }

    /// Back to the first step
    pub fn reset(&mut self) {
        self.prev_minutes = 0;
        self.current_minutes = self.min_minutes;
    }
}

impl Default for FibonacciBackoff {
    fn default() -> Self {
        Self::new(
            crate::constants::MIN_ERROR_BACKOFF_MINUTES,
            crate::constants::MAX_ERROR_BACKOFF_MINUTES,
        )
    }
}
