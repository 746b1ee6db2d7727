//! Fixed-window call budget for the price API.
//!
//! The provider enforces a per-minute ceiling on its side; this counter
//! enforces the same ceiling on ours so a cycle never runs into HTTP 429s
//! it could have predicted. The window resets on rollover; nothing ever
//! waits on an exhausted budget.

use std::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_secs(60);

/// Calls-per-minute counter shared across the symbols of one cycle.
#[derive(Debug)]
pub struct RateBudget {
    /// Call ceiling per window.
    limit: u32,
    /// Calls consumed in the current window.
    used: u32,
    /// When the current window started.
    window_started: Instant,
}

impl RateBudget {
    pub fn new(calls_per_minute: u32) -> Self {
        Self {
            limit: calls_per_minute,
            used: 0,
            window_started: Instant::now(),
        }
    }

    /// Consume one call from the budget. Returns false when the window is
    /// exhausted; the caller short-circuits instead of waiting.
    ///
    /// A unit is consumed per attempt regardless of how the call turns out,
    /// because failed calls still count against the provider's limit.
    pub fn try_consume(&mut self) -> bool {
        self.roll_window();

        if self.used < self.limit {
            self.used += 1;
            true
        } else {
            false
        }
    }

    /// Calls left in the current window.
    pub fn remaining(&mut self) -> u32 {
        self.roll_window();
        self.limit - self.used
    }

    fn roll_window(&mut self) {
        let now = Instant::now();
        if now.duration_since(self.window_started) >= WINDOW {
            self.used = 0;
            self.window_started = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consumes_up_to_the_limit() {
        let mut budget = RateBudget::new(3);
        assert!(budget.try_consume());
        assert!(budget.try_consume());
        assert!(budget.try_consume());
        assert!(!budget.try_consume());
        assert_eq!(budget.remaining(), 0);
    }

    #[test]
    fn window_rollover_resets_the_counter() {
        let mut budget = RateBudget::new(1);
        assert!(budget.try_consume());
        assert!(!budget.try_consume());

        // Rewind the window start to simulate elapsed time.
        budget.window_started = Instant::now() - Duration::from_secs(61);

        assert!(budget.try_consume());
    }

    #[test]
    fn exhausted_check_does_not_consume() {
        let mut budget = RateBudget::new(2);
        budget.try_consume();
        budget.try_consume();

        // Repeated failed attempts must not push `used` past the limit.
        for _ in 0..5 {
            assert!(!budget.try_consume());
        }
        budget.window_started = Instant::now() - Duration::from_secs(61);
        assert_eq!(budget.remaining(), 2);
    }

    #[test]
    fn zero_budget_rejects_everything() {
        let mut budget = RateBudget::new(0);
        assert!(!budget.try_consume());
    }
}
