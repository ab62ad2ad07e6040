//! # Fibonacci Backoff
//!
//! Provides a Fibonacci-based backoff for retrying failed reconciliations.
//! It grows more slowly than exponential backoff, so a resource blocked on a
//! missing dependency is retried often at first without hammering the API server.
//!
//! With the default settings (5s min, 300s max) the sequence is:
//! 5s, 5s, 10s, 15s, 25s, 40s, 65s, 105s, 170s, 275s, 300s (max).

use std::time::Duration;

/// Fibonacci backoff calculator
///
/// Each delay is the sum of the previous two, starting from `min` twice and
/// capped at `max`.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    /// Minimum delay (first two values, and value after reset)
    min: Duration,
    /// Previous delay
    prev: Duration,
    /// Current delay
    current: Duration,
    /// Maximum delay
    max: Duration,
}

impl FibonacciBackoff {
    /// Create a new Fibonacci backoff bounded by `min` and `max`.
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            prev: Duration::ZERO,
            current: min,
            max,
        }
    }

    /// Get the next backoff duration and advance the sequence.
    pub fn next_backoff(&mut self) -> Duration {
        let result = self.current;

        let next = self.prev.saturating_add(self.current);
        self.prev = self.current;
        self.current = std::cmp::min(next, self.max);

        result
    }

    /// Reset the backoff to the initial state
    pub fn reset(&mut self) {
        self.prev = Duration::ZERO;
        self.current = self.min;
    }
}
