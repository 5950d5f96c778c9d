//! Per-identity fixed-window rate limiting.
//!
//! Flow Overview:
//! 1) Look up the identity's window, opening a fresh one-hour window when it is
//!    missing or has expired. Windows start at first use, not on the hour.
//! 2) Count the call unconditionally, including calls over the limit.
//! 3) Report `allowed`, `remaining` and the window reset time.
//!
//! State is process-local. Each identity's update happens under its map shard
//! lock, so concurrent checks for one identity never lose an increment. A
//! background sweep drops expired windows; it never changes a `check` outcome
//! because `check` reopens expired windows on its own.
//!
//! Scaling: a multi-instance deployment needs a shared atomic counter store.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use std::{
    sync::{Arc, Weak},
    time::Duration,
};
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tracing::debug;

pub const DEFAULT_LIMIT: u32 = 30;
pub const WINDOW_SECONDS: i64 = 60 * 60;
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Outcome of a single `check`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_time: DateTime<Utc>,
}

impl RateLimitResult {
    /// Whole seconds until the window resets, never negative.
    #[must_use]
    pub fn retry_after_seconds(&self, now: DateTime<Utc>) -> u64 {
        u64::try_from((self.reset_time - now).num_seconds()).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy)]
struct RateLimitEntry {
    count: u32,
    reset_time: DateTime<Utc>,
}

impl RateLimitEntry {
    fn open(now: DateTime<Utc>) -> Self {
        Self {
            count: 0,
            reset_time: now + ChronoDuration::seconds(WINDOW_SECONDS),
        }
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.reset_time
    }
}

#[derive(Debug, Default)]
pub struct RateLimiter {
    entries: DashMap<String, RateLimitEntry>,
}

impl RateLimiter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one operation for `identity` and decide whether it is allowed.
    #[must_use]
    pub fn check(&self, identity: &str, limit: u32) -> RateLimitResult {
        self.check_at(identity, limit, Utc::now())
    }

    /// `check` against an explicit clock reading.
    #[must_use]
    pub fn check_at(&self, identity: &str, limit: u32, now: DateTime<Utc>) -> RateLimitResult {
        let mut entry = self
            .entries
            .entry(identity.to_string())
            .or_insert_with(|| RateLimitEntry::open(now));

        if entry.is_expired(now) {
            *entry = RateLimitEntry::open(now);
        }

        entry.count = entry.count.saturating_add(1);
        let RateLimitEntry { count, reset_time } = *entry;
        drop(entry);

        RateLimitResult {
            allowed: count <= limit,
            limit,
            remaining: limit.saturating_sub(count),
            reset_time,
        }
    }

    /// Forget `identity`; its next check opens a new window.
    pub fn reset(&self, identity: &str) {
        if self.entries.remove(identity).is_some() {
            debug!(identity, "rate limit window reset");
        }
    }

    /// Drop every window that expired before `now`, returning how many were removed.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let keep = !entry.is_expired(now);
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    /// Number of identities currently tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run `sweep_expired` every `period` until the limiter is dropped.
    #[must_use]
    pub fn spawn_sweeper(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(sweep_loop(Arc::downgrade(self), period))
    }
}

async fn sweep_loop(limiter: Weak<RateLimiter>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // The first tick completes immediately.
    interval.tick().await;

    loop {
        interval.tick().await;

        let Some(limiter) = limiter.upgrade() else {
            debug!("rate limiter dropped, stopping sweeper");
            break;
        };

        let removed = limiter.sweep_expired(Utc::now());
        if removed > 0 {
            debug!(
                removed,
                tracked = limiter.len(),
                "swept expired rate limit windows"
            );
        }
    }
}
