//! Token Bucket
//!
//! Lazily refilled token bucket used per visitor.

use std::time::Instant;

// == Token Bucket ==
/// Holds up to `capacity` tokens, refilled continuously at `rate` tokens per
/// second. Tokens are only recomputed when the bucket is consulted.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    capacity: f64,
    rate: f64,
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    // == Constructor ==
    /// Creates a full bucket.
    ///
    /// A negative or non-finite `rate` is treated as 0: the bucket never
    /// refills, but it never drains either.
    pub fn new(capacity: u32, rate: f64, now: Instant) -> Self {
        let capacity = f64::from(capacity);
        let rate = if rate.is_finite() { rate.max(0.0) } else { 0.0 };
        Self {
            capacity,
            rate,
            tokens: capacity,
            last_refill: now,
        }
    }

    // == Try Acquire ==
    /// Spends one token if available.
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        self.refill(now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Tokens available at `now`, without spending any.
    pub fn available(&mut self, now: Instant) -> f64 {
        self.refill(now);
        self.tokens
    }

    fn refill(&mut self, now: Instant) {
        // Instants handed in out of order never drain the bucket.
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate).min(self.capacity);
        if now > self.last_refill {
            self.last_refill = now;
        }
    }
}
