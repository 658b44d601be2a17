//! Fixed-window in-memory rate limiter, applied to login attempts keyed by
//! username + client IP.

use dashmap::DashMap;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("Rate limit exceeded")]
    LimitExceeded,
}

#[derive(Debug, Clone)]
struct WindowEntry {
    count: u32,
    window_start: Instant,
}

#[derive(Debug)]
pub struct RateLimiter {
    max_per_window: u32,
    window: Duration,
    entries: DashMap<String, WindowEntry>,
}

impl RateLimiter {
    pub fn new(max_per_window: u32, window: Duration) -> Self {
        Self {
            max_per_window,
            window,
            entries: DashMap::new(),
        }
    }

    /// Record an attempt for `key`; errors once the window budget is spent.
    pub fn check(&self, key: &str) -> Result<(), RateLimitError> {
        let now = Instant::now();
        let mut entry = self.entries.entry(key.to_string()).or_insert(WindowEntry {
            count: 0,
            window_start: now,
        });

        if now.duration_since(entry.window_start) >= self.window {
            entry.count = 0;
            entry.window_start = now;
        }

        if entry.count >= self.max_per_window {
            return Err(RateLimitError::LimitExceeded);
        }
        entry.count += 1;
        Ok(())
    }

    /// Clear the window after a successful attempt so earlier failures do
    /// not count against future ones.
    pub fn reset(&self, key: &str) {
        self.entries.remove(key);
    }
}
