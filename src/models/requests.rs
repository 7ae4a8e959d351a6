//! Request DTOs for the notes API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;
use uuid::Uuid;

/// Maximum note text size in bytes
pub const MAX_TEXT_LENGTH: usize = 64 * 1024;

fn check_text(text: &str) -> Option<String> {
    if text.len() > MAX_TEXT_LENGTH {
        return Some(format!(
            "Text exceeds maximum length of {} bytes",
            MAX_TEXT_LENGTH
        ));
    }
    None
}

/// Request body for creating a note (POST /note/)
///
/// # Fields
/// - `text`: The note body
/// - `expiration`: Lifetime in minutes; negative values are rejected at
///   deserialization
#[derive(Debug, Clone, Deserialize)]
pub struct CreateNoteRequest {
    pub text: String,
    pub expiration: u32,
}

impl CreateNoteRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        check_text(&self.text)
    }
}

/// Request body for updating a note (PATCH /note/:uid)
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateNoteRequest {
    pub text: String,
}

impl UpdateNoteRequest {
    pub fn validate(&self) -> Option<String> {
        check_text(&self.text)
    }
}

/// Identifies a note by id, for pop (body) and peek (query string)
#[derive(Debug, Clone, Deserialize)]
pub struct NoteIdRequest {
    pub id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_deserialize() {
        let json = r#"{"text": "hello", "expiration": 10}"#;
        let req: CreateNoteRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.text, "hello");
        assert_eq!(req.expiration, 10);
        assert!(req.validate().is_none());
    }

    #[test]
    fn test_create_request_rejects_negative_expiration() {
        let json = r#"{"text": "hello", "expiration": -1}"#;
        assert!(serde_json::from_str::<CreateNoteRequest>(json).is_err());
    }

    #[test]
    fn test_validate_text_too_long() {
        let req = UpdateNoteRequest {
            text: "x".repeat(MAX_TEXT_LENGTH + 1),
        };
        assert!(req.validate().is_some());
    }

    #[test]
    fn test_note_id_request() {
        let id = Uuid::new_v4();
        let json = format!(r#"{{"id": "{}"}}"#, id);
        let req: NoteIdRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(req.id, id);
    }
}
