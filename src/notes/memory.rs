//! In-Memory Note Store
//!
//! Keeps notes in a vector guarded by a single mutex.

use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use uuid::Uuid;

use crate::error::StoreResult;
use crate::notes::{Note, NoteStore};

// == Memory Note Store ==
/// Note store backed by a `Vec` in insertion order.
///
/// The whole collection sits behind one exclusive lock, so every operation,
/// sweeps included, is serialized.
#[derive(Debug, Default)]
pub struct MemoryNoteStore {
    notes: Mutex<Vec<Note>>,
}

impl MemoryNoteStore {
    // == Constructor ==
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave a half-written note behind,
    // so a poisoned lock is still safe to use.
    fn notes(&self) -> MutexGuard<'_, Vec<Note>> {
        self.notes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl NoteStore for MemoryNoteStore {
    fn create(&self, id: Uuid, text: String, expiration: u32) -> StoreResult<Note> {
        let note = Note::new(id, text, expiration);
        self.notes().push(note.clone());
        Ok(note)
    }

    fn get(&self, id: Uuid) -> StoreResult<Option<Note>> {
        Ok(self.notes().iter().find(|n| n.id == id).cloned())
    }

    fn list(&self) -> StoreResult<Vec<Note>> {
        Ok(self.notes().clone())
    }

    fn update(&self, id: Uuid, text: String) -> StoreResult<Option<Note>> {
        let mut notes = self.notes();
        Ok(notes.iter_mut().find(|n| n.id == id).map(|note| {
            note.text = text;
            note.clone()
        }))
    }

    fn delete(&self, id: Uuid) -> StoreResult<Option<Note>> {
        let mut notes = self.notes();
        Ok(notes
            .iter()
            .position(|n| n.id == id)
            .map(|idx| notes.remove(idx)))
    }

    fn clear_expired(&self) -> StoreResult<usize> {
        let now = Utc::now();
        let mut notes = self.notes();
        let before = notes.len();
        notes.retain(|note| !note.is_expired_at(now));
        Ok(before - notes.len())
    }

    fn len(&self) -> StoreResult<usize> {
        Ok(self.notes().len())
    }
}
