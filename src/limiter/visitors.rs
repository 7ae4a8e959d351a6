//! Visitor Limiter
//!
//! Per-client token buckets keyed by client address.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::limiter::TokenBucket;

// == Limiter Config ==
/// Token bucket parameters and the idle time after which a visitor is forgotten.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimiterConfig {
    /// Tokens added per second
    pub rate_per_second: f64,
    /// Bucket capacity
    pub burst: u32,
    /// Idle time before eviction
    pub stale_after: Duration,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            rate_per_second: 5.0,
            burst: 10,
            stale_after: Duration::from_secs(3 * 60),
        }
    }
}

// == Admission ==
/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allow,
    Deny,
}

impl Admission {
    pub fn is_allowed(self) -> bool {
        self == Admission::Allow
    }
}

#[derive(Debug)]
struct Visitor {
    bucket: TokenBucket,
    last_seen: Instant,
}

// == Visitor Limiter ==
/// Registry of per-client token buckets.
///
/// One mutex guards the whole map. Lookup, lazy creation, the `last_seen`
/// update and the token spend all happen inside a single critical section,
/// so two first requests from the same client can never create two buckets.
#[derive(Debug)]
pub struct VisitorLimiter {
    config: LimiterConfig,
    visitors: Mutex<HashMap<String, Visitor>>,
}

impl VisitorLimiter {
    // == Constructor ==
    pub fn new(config: LimiterConfig) -> Self {
        Self {
            config,
            visitors: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &LimiterConfig {
        &self.config
    }

    fn visitors(&self) -> MutexGuard<'_, HashMap<String, Visitor>> {
        self.visitors
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // == Admit ==
    /// Checks whether `key` may make a request now, spending a token if so.
    pub fn admit(&self, key: &str) -> Admission {
        self.admit_at(key, Instant::now())
    }

    /// Same as [`admit`](Self::admit) with an explicit clock reading.
    pub fn admit_at(&self, key: &str, now: Instant) -> Admission {
        let mut visitors = self.visitors();
        let visitor = visitors.entry(key.to_string()).or_insert_with(|| Visitor {
            bucket: TokenBucket::new(self.config.burst, self.config.rate_per_second, now),
            last_seen: now,
        });

        visitor.last_seen = visitor.last_seen.max(now);
        if visitor.bucket.try_acquire(now) {
            Admission::Allow
        } else {
            Admission::Deny
        }
    }

    // == Evict Stale ==
    /// Forgets every visitor idle for longer than the staleness threshold.
    ///
    /// Returns the number of visitors removed.
    pub fn evict_stale(&self) -> usize {
        self.evict_stale_at(Instant::now())
    }

    /// Same as [`evict_stale`](Self::evict_stale) with an explicit clock reading.
    pub fn evict_stale_at(&self, now: Instant) -> usize {
        let stale_after = self.config.stale_after;
        let mut visitors = self.visitors();
        let before = visitors.len();
        visitors.retain(|_, v| now.saturating_duration_since(v.last_seen) <= stale_after);
        before - visitors.len()
    }

    // == Length ==
    /// Returns the number of tracked visitors.
    pub fn len(&self) -> usize {
        self.visitors().len()
    }

    pub fn is_empty(&self) -> bool {
        self.visitors().is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.visitors().contains_key(key)
    }
}

impl Default for VisitorLimiter {
    fn default() -> Self {
        Self::new(LimiterConfig::default())
    }
}
