//! Sliding-window rate limiter.
//!
//! Bounds the total number of evaluations admitted in any trailing window
//! (default: 1 000 per 1 000 ms), independent of which expression runs.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

pub const DEFAULT_MAX_PER_WINDOW: usize = 1_000;
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(1_000);

#[derive(Debug)]
pub struct RateLimiter {
    admitted: VecDeque<Instant>,
    max: usize,
    window: Duration,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PER_WINDOW, DEFAULT_WINDOW)
    }
}

impl RateLimiter {
    pub fn new(max: usize, window: Duration) -> Self {
        RateLimiter { admitted: VecDeque::new(), max, window }
    }

    pub fn admit(&mut self) -> bool {
        self.admit_at(Instant::now())
    }

    /// Admit at an explicit instant.  Instants must be non-decreasing.
    pub fn admit_at(&mut self, now: Instant) -> bool {
        self.expire(now);
        if self.admitted.len() >= self.max {
            return false;
        }
        self.admitted.push_back(now);
        true
    }

    fn expire(&mut self, now: Instant) {
        while let Some(&oldest) = self.admitted.front() {
            if now.saturating_duration_since(oldest) < self.window {
                break;
            }
            self.admitted.pop_front();
        }
    }

    /// Admissions currently counted against the window.
    pub fn in_window(&self) -> usize {
        self.admitted.len()
    }

    pub fn reset(&mut self) {
        self.admitted.clear();
    }
}
