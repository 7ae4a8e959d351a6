//! Response DTOs for the notes API
//!
//! Defines the structure of outgoing HTTP response bodies. Notes themselves
//! are serialized directly from [`crate::notes::Note`].

use serde::Serialize;

use crate::tasks::{PurgerState, PurgerStatus};

/// Response body for peek (GET /note/api/)
#[derive(Debug, Clone, Serialize)]
pub struct PeekResponse {
    pub exist: bool,
}

/// State of one background purger
#[derive(Debug, Clone, Serialize)]
pub struct PurgerReport {
    pub name: String,
    pub state: PurgerState,
}

impl From<&PurgerStatus> for PurgerReport {
    fn from(status: &PurgerStatus) -> Self {
        Self {
            name: status.name().to_string(),
            state: status.state(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// "healthy", or "degraded" once any purger has exhausted its error budget
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
    pub purgers: Vec<PurgerReport>,
}

impl HealthResponse {
    /// Builds a report from the current purger states.
    pub fn from_purgers(purgers: Vec<PurgerReport>) -> Self {
        let degraded = purgers.iter().any(|p| p.state == PurgerState::Exhausted);
        Self {
            status: if degraded { "degraded" } else { "healthy" }.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            purgers,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Notes currently stored, expired-but-unswept included
    pub notes: usize,
    /// Clients with a live rate limiter
    pub visitors: usize,
    pub purgers: Vec<PurgerReport>,
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
