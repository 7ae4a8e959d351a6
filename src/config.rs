//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::limiter::LimiterConfig;
use crate::tasks::PurgerConfig;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// SQLite database file; the in-memory store is used when unset
    pub database_path: Option<String>,
    /// Seconds between note TTL sweeps
    pub note_sweep_interval: u64,
    /// Consecutive failed note sweeps before the sweeper gives up
    pub note_sweep_error_budget: u32,
    /// Seconds between stale visitor evictions
    pub visitor_sweep_interval: u64,
    /// Consecutive failed evictions before the evictor gives up
    pub visitor_sweep_error_budget: u32,
    /// Tokens refilled per second for each client
    pub rate_limit_per_second: f64,
    /// Burst size for each client
    pub rate_limit_burst: u32,
    /// Seconds of inactivity before a client's limiter is dropped
    pub visitor_stale_after: u64,
    /// Origins allowed by CORS
    pub allowed_origins: Vec<String>,
    /// Bearer token required by guarded routes; unset disables the check
    pub auth_token: Option<String>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 8080)
    /// - `DATABASE_PATH` - SQLite file (default: unset, in-memory store)
    /// - `NOTE_SWEEP_INTERVAL` - Seconds between note sweeps (default: 60)
    /// - `NOTE_SWEEP_ERROR_BUDGET` - Tolerated consecutive failures (default: 5)
    /// - `VISITOR_SWEEP_INTERVAL` - Seconds between visitor evictions (default: 60)
    /// - `VISITOR_SWEEP_ERROR_BUDGET` - Tolerated consecutive failures (default: 5)
    /// - `RATE_LIMIT_PER_SECOND` - Token refill rate (default: 5)
    /// - `RATE_LIMIT_BURST` - Bucket capacity (default: 10)
    /// - `VISITOR_STALE_AFTER` - Idle seconds before eviction (default: 180)
    /// - `ALLOWED_ORIGINS` - Comma separated CORS origins (default: http://localhost:8000)
    /// - `AUTH_TOKEN` - Bearer token for guarded routes (default: unset)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            database_path: non_empty_var("DATABASE_PATH"),
            note_sweep_interval: interval_var("NOTE_SWEEP_INTERVAL")
                .unwrap_or(defaults.note_sweep_interval),
            note_sweep_error_budget: parse_var("NOTE_SWEEP_ERROR_BUDGET")
                .unwrap_or(defaults.note_sweep_error_budget),
            visitor_sweep_interval: interval_var("VISITOR_SWEEP_INTERVAL")
                .unwrap_or(defaults.visitor_sweep_interval),
            visitor_sweep_error_budget: parse_var("VISITOR_SWEEP_ERROR_BUDGET")
                .unwrap_or(defaults.visitor_sweep_error_budget),
            rate_limit_per_second: rate_var("RATE_LIMIT_PER_SECOND")
                .unwrap_or(defaults.rate_limit_per_second),
            rate_limit_burst: parse_var("RATE_LIMIT_BURST").unwrap_or(defaults.rate_limit_burst),
            visitor_stale_after: parse_var("VISITOR_STALE_AFTER")
                .unwrap_or(defaults.visitor_stale_after),
            allowed_origins: non_empty_var("ALLOWED_ORIGINS")
                .map(|v| split_list(&v))
                .unwrap_or(defaults.allowed_origins),
            auth_token: non_empty_var("AUTH_TOKEN"),
        }
    }

    /// Schedule for the note TTL sweeper.
    pub fn note_purger(&self) -> PurgerConfig {
        PurgerConfig::new(
            Duration::from_secs(self.note_sweep_interval),
            self.note_sweep_error_budget,
        )
    }

    /// Schedule for the stale visitor evictor.
    pub fn visitor_purger(&self) -> PurgerConfig {
        PurgerConfig::new(
            Duration::from_secs(self.visitor_sweep_interval),
            self.visitor_sweep_error_budget,
        )
    }

    pub fn limiter(&self) -> LimiterConfig {
        LimiterConfig {
            rate_per_second: self.rate_limit_per_second,
            burst: self.rate_limit_burst,
            stale_after: Duration::from_secs(self.visitor_stale_after),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 8080,
            database_path: None,
            note_sweep_interval: 60,
            note_sweep_error_budget: 5,
            visitor_sweep_interval: 60,
            visitor_sweep_error_budget: 5,
            rate_limit_per_second: 5.0,
            rate_limit_burst: 10,
            visitor_stale_after: 180,
            allowed_origins: vec!["http://localhost:8000".to_string()],
            auth_token: None,
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

/// Sweep interval in seconds; zero would spin the purger, so it is ignored.
fn interval_var(name: &str) -> Option<u64> {
    parse_var(name).filter(|&secs: &u64| secs > 0)
}

/// Refill rate; negative, NaN and infinite values are ignored.
fn rate_var(name: &str) -> Option<f64> {
    parse_var(name).filter(|&rate: &f64| rate.is_finite() && rate >= 0.0)
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
