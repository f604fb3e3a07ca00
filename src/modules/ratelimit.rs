use dashmap::DashMap;
use tracing::debug;

use crate::util::{now_ms, HOUR_MS};

#[derive(Debug, Clone, Copy)]
struct RateLimitEntry {
    window_reset_at: i64,
    usage: u32,
}

/// Per-user request quota over a rolling window. Kept in memory only.
#[derive(Debug)]
pub(crate) struct RateLimiter {
    limit: u32,
    window_ms: i64,
    entries: DashMap<u64, RateLimitEntry>,
}

impl RateLimiter {
    pub(crate) fn new(limit: u32) -> Self {
        Self::with_window(limit, HOUR_MS)
    }

    pub(crate) fn with_window(limit: u32, window_ms: i64) -> Self {
        Self {
            limit,
            window_ms,
            entries: DashMap::new(),
        }
    }

    pub(crate) fn try_consume(&self, user_id: u64) -> bool {
        self.try_consume_at(user_id, now_ms())
    }

    pub(crate) fn try_consume_at(&self, user_id: u64, now: i64) -> bool {
        let mut entry = self.entries.entry(user_id).or_insert(RateLimitEntry {
            window_reset_at: now + self.window_ms,
            usage: 0,
        });

        if now >= entry.window_reset_at {
            entry.usage = 0;
            entry.window_reset_at = now + self.window_ms;
        }

        if entry.usage + 1 > self.limit {
            debug!(user_id, usage = entry.usage, "rate limit reached");
            return false;
        }

        entry.usage += 1;
        true
    }

    /// When the user's current window ends, if they have one.
    pub(crate) fn reset_at(&self, user_id: u64) -> Option<i64> {
        self.entries.get(&user_id).map(|e| e.window_reset_at)
    }

    pub(crate) fn check(&self, user_id: u64) -> Result<(), RateLimited> {
        if self.try_consume(user_id) {
            return Ok(());
        }

        Err(RateLimited {
            reset_at: self.reset_at(user_id).unwrap_or_else(now_ms),
        })
    }
}

#[derive(Debug)]
pub(crate) struct RateLimited {
    pub(crate) reset_at: i64,
}

impl std::fmt::Display for RateLimited {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            fmt,
            "you've hit the request limit, try again <t:{}:R>",
            self.reset_at / 1000
        )
    }
}

impl std::error::Error for RateLimited {}
