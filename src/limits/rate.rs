//! Fixed-window rate limiter, in-process.
//!
//! One mutex guards the whole table; a consume is a single
//! read-modify-write under that lock, so two concurrent requests can
//! never both claim the last slot. Windows reset lazily on the next
//! consume after expiry, there is no background sweeper.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

/// Outcome of one quota consume attempt.
#[derive(Debug, Clone)]
pub struct RateDecision {
    pub allowed: bool,
    /// Slots left in the current window after this attempt.
    pub remaining: u32,
    /// When the current window ends and the count resets.
    pub reset_at: DateTime<Utc>,
}

struct Window {
    started: Instant,
    count: u32,
}

pub struct RateLimiter {
    window: Duration,
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Try to consume one slot for `key` against `limit`.
    ///
    /// A rejected attempt does not consume; the caller can retry after
    /// `reset_at` without penalty.
    pub fn consume(&self, key: &str, limit: u32) -> RateDecision {
        let now = Instant::now();
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());

        let entry = windows.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.count = 0;
        }

        let window_left = self.window.saturating_sub(now.duration_since(entry.started));
        let reset_at = Utc::now()
            + chrono::Duration::from_std(window_left).unwrap_or(chrono::Duration::zero());

        if entry.count >= limit {
            tracing::debug!(key, limit, "rate limit exceeded");
            return RateDecision {
                allowed: false,
                remaining: 0,
                reset_at,
            };
        }

        entry.count += 1;
        RateDecision {
            allowed: true,
            remaining: limit - entry.count,
            reset_at,
        }
    }

    /// Seconds until the window resets, for the `Retry-After` header.
    pub fn retry_after_secs(decision: &RateDecision) -> u64 {
        (decision.reset_at - Utc::now()).num_seconds().max(1) as u64
    }
}
