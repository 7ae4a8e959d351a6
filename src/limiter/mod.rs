//! Limiter Module
//!
//! Per-client rate limiting with token buckets.

mod bucket;
mod visitors;

pub use bucket::TokenBucket;
pub use visitors::{Admission, LimiterConfig, VisitorLimiter};
