// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Fixed-window rate limiter for the public API endpoints.
//!
//! Counters live behind the [`RateLimitStore`] trait. [`MemoryStore`] keeps
//! them in process memory, which means every gateway instance enforces its
//! own quota: with N instances behind a load balancer a client can get up
//! to N times the configured limit. A shared store has to implement the
//! trait for multi-instance deployments.

use crate::config::RateLimitConfig;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Counter state for one client identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    /// Requests admitted in the current window
    pub count: u32,
    /// End of the current window (unix epoch milliseconds)
    pub reset_at_ms: i64,
}

impl RateLimitEntry {
    fn open(now_ms: i64, window_ms: u64) -> Self {
        Self {
            count: 1,
            reset_at_ms: now_ms.saturating_add(window_ms.min(i64::MAX as u64) as i64),
        }
    }

    /// Whether the window has ended at `now_ms`.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms > self.reset_at_ms
    }
}

/// Outcome of a store increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hit {
    /// Request counted; entry after the increment
    Admitted(RateLimitEntry),
    /// Quota exhausted; entry left untouched
    Rejected(RateLimitEntry),
}

/// Storage for rate-limit counters.
///
/// `increment` must apply the whole window decision atomically for a key.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Read the entry for a key, expired or not.
    async fn get(&self, key: &str) -> Option<RateLimitEntry>;

    /// Count one request against `key` under the given quota.
    async fn increment(&self, key: &str, config: &RateLimitConfig, now_ms: i64) -> Hit;

    /// Delete entries whose window ended before `now_ms`. Returns the number removed.
    async fn sweep(&self, now_ms: i64) -> usize;

    /// Number of tracked keys.
    async fn len(&self) -> usize;
}

/// Process-local store. Not shared across instances.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, RateLimitEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateLimitStore for MemoryStore {
    async fn get(&self, key: &str) -> Option<RateLimitEntry> {
        self.entries.read().await.get(key).copied()
    }

    async fn increment(&self, key: &str, config: &RateLimitConfig, now_ms: i64) -> Hit {
        let mut entries = self.entries.write().await;

        match entries.get_mut(key) {
            Some(entry) if !entry.is_expired(now_ms) => {
                if entry.count < config.limit {
                    entry.count += 1;
                    Hit::Admitted(*entry)
                } else {
                    Hit::Rejected(*entry)
                }
            }
            _ => {
                let fresh = RateLimitEntry::open(now_ms, config.window_ms);
                if config.limit == 0 {
                    return Hit::Rejected(RateLimitEntry { count: 0, ..fresh });
                }
                entries.insert(key.to_string(), fresh);
                Hit::Admitted(fresh)
            }
        }
    }

    async fn sweep(&self, now_ms: i64) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now_ms));
        before - entries.len()
    }

    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

/// Result of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitResult {
    /// Whether the request is admitted
    pub success: bool,
    /// Configured quota
    pub limit: u32,
    /// Requests left in the current window
    pub remaining: u32,
    /// Window end (unix epoch milliseconds)
    pub reset: i64,
}

impl RateLimitResult {
    /// Seconds until the window ends, never less than one.
    pub fn retry_after_secs(&self, now_ms: i64) -> u64 {
        let millis = self.reset.saturating_sub(now_ms).max(0) as u64;
        millis.div_ceil(1000).max(1)
    }

    /// Window end as unix epoch seconds.
    pub fn reset_epoch_secs(&self) -> i64 {
        self.reset.div_euclid(1000) + i64::from(self.reset.rem_euclid(1000) != 0)
    }
}

/// Rate limiter over an injected store.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
}

impl RateLimiter {
    /// Create a limiter over the given store.
    pub fn new(store: Arc<dyn RateLimitStore>) -> Self {
        Self { store }
    }

    /// Create a limiter over a fresh [`MemoryStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Check and count a request using the wall clock.
    pub async fn check(&self, identifier: &str, config: &RateLimitConfig) -> RateLimitResult {
        self.check_at(identifier, config, now_ms()).await
    }

    /// Check and count a request at an explicit time.
    pub async fn check_at(
        &self,
        identifier: &str,
        config: &RateLimitConfig,
        now_ms: i64,
    ) -> RateLimitResult {
        match self.store.increment(identifier, config, now_ms).await {
            Hit::Admitted(entry) => RateLimitResult {
                success: true,
                limit: config.limit,
                remaining: config.limit.saturating_sub(entry.count),
                reset: entry.reset_at_ms,
            },
            Hit::Rejected(entry) => {
                debug!(
                    identifier,
                    limit = config.limit,
                    reset = entry.reset_at_ms,
                    "Rate limit exceeded"
                );
                RateLimitResult {
                    success: false,
                    limit: config.limit,
                    remaining: 0,
                    reset: entry.reset_at_ms,
                }
            }
        }
    }

    /// Remove expired entries. Returns the number removed.
    pub async fn sweep(&self) -> usize {
        self.sweep_at(now_ms()).await
    }

    pub async fn sweep_at(&self, now_ms: i64) -> usize {
        self.store.sweep(now_ms).await
    }

    /// Number of tracked identifiers.
    pub async fn tracked(&self) -> usize {
        self.store.len().await
    }
}

/// Current wall-clock time in unix epoch milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
