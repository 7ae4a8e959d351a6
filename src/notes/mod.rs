//! Notes Module
//!
//! The note store contract and its in-memory and SQLite implementations.

mod memory;
mod note;
mod sqlite;

#[cfg(test)]
mod property_tests;

use uuid::Uuid;

use crate::error::StoreResult;

// Re-export public types
pub use memory::MemoryNoteStore;
pub use note::Note;
pub use sqlite::SqliteNoteStore;

// == Note Store Contract ==
/// CRUD and TTL sweep over notes.
///
/// Every implementation must be safe to call from many threads at once,
/// including `clear_expired` running concurrently with the other operations.
/// A missing note is reported as `Ok(None)`; `Err` always means the store
/// itself failed.
pub trait NoteStore: Send + Sync {
    /// Stores a new note stamped with the current time.
    fn create(&self, id: Uuid, text: String, expiration: u32) -> StoreResult<Note>;

    /// Looks up a note by id.
    fn get(&self, id: Uuid) -> StoreResult<Option<Note>>;

    /// Returns every stored note.
    ///
    /// The in-memory store yields insertion order, the SQLite store yields
    /// creation-time order.
    fn list(&self) -> StoreResult<Vec<Note>>;

    /// Replaces the text of a note, leaving id, creation time and expiration
    /// untouched.
    fn update(&self, id: Uuid, text: String) -> StoreResult<Option<Note>>;

    /// Removes a note, returning it as it was just before removal.
    fn delete(&self, id: Uuid) -> StoreResult<Option<Note>>;

    /// Removes every expired note and returns how many were removed.
    fn clear_expired(&self) -> StoreResult<usize>;

    /// Returns the number of stored notes.
    fn len(&self) -> StoreResult<usize>;

    /// Returns true if no notes are stored.
    fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}
