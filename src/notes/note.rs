//! Note Module
//!
//! Defines the note record and its expiry rule.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

// == Note ==
/// A short-lived text note.
///
/// Only `text` may change after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Note {
    /// Server-generated identifier
    pub id: Uuid,
    /// Note body
    pub text: String,
    /// Creation time
    pub created: DateTime<Utc>,
    /// Lifetime in minutes, counted from `created`
    pub expiration: u32,
}

impl Note {
    // == Constructor ==
    /// Creates a note stamped with the current time.
    pub fn new(id: Uuid, text: impl Into<String>, expiration: u32) -> Self {
        Self {
            id,
            text: text.into(),
            created: Utc::now(),
            expiration,
        }
    }

    // == Expires At ==
    /// Returns the instant from which the note counts as expired.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created + Duration::minutes(i64::from(self.expiration))
    }

    // == Is Expired ==
    /// Checks whether the note is expired at `now`.
    ///
    /// A note is expired once `now >= created + expiration`, so a zero
    /// expiration is expired from the moment it is created.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }

    /// Checks whether the note is expired right now.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}
