//! SQLite Note Store
//!
//! Relational note store over a single `notes` table.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SubsecRound, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::notes::{Note, NoteStore};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS notes (
    id         TEXT PRIMARY KEY,
    text       TEXT NOT NULL,
    created    INTEGER NOT NULL,
    expiration INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS notes_created_idx ON notes (created);
";

const NOTE_COLUMNS: &str = "id, text, created, expiration";

// == SQLite Note Store ==
/// Note store persisted in SQLite.
///
/// `created` is stored as Unix milliseconds so the sweep can be expressed as
/// plain integer arithmetic in SQL.
#[derive(Debug)]
pub struct SqliteNoteStore {
    conn: Mutex<Connection>,
}

impl SqliteNoteStore {
    // == Constructors ==
    /// Opens (or creates) a database file and ensures the schema exists.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        debug!("Opening note database at {}", path.display());
        Self::with_connection(Connection::open(path)?)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// == Row Decoding ==
fn note_from_row(row: &Row<'_>) -> rusqlite::Result<RawNote> {
    Ok(RawNote {
        id: row.get(0)?,
        text: row.get(1)?,
        created_ms: row.get(2)?,
        expiration: row.get(3)?,
    })
}

/// Column values before validation.
struct RawNote {
    id: String,
    text: String,
    created_ms: i64,
    expiration: u32,
}

impl TryFrom<RawNote> for Note {
    type Error = StoreError;

    fn try_from(raw: RawNote) -> StoreResult<Self> {
        let id = Uuid::parse_str(&raw.id)
            .map_err(|e| StoreError::Corrupt(format!("bad id '{}': {}", raw.id, e)))?;
        let created = DateTime::<Utc>::from_timestamp_millis(raw.created_ms).ok_or_else(|| {
            StoreError::Corrupt(format!("bad timestamp {} for note {}", raw.created_ms, id))
        })?;
        Ok(Note {
            id,
            text: raw.text,
            created,
            expiration: raw.expiration,
        })
    }
}

fn decode(raw: Option<RawNote>) -> StoreResult<Option<Note>> {
    raw.map(Note::try_from).transpose()
}

impl NoteStore for SqliteNoteStore {
    fn create(&self, id: Uuid, text: String, expiration: u32) -> StoreResult<Note> {
        let mut note = Note::new(id, text, expiration);
        // Match the stored millisecond precision so `get` returns the same value.
        note.created = note.created.trunc_subsecs(3);
        self.conn().execute(
            "INSERT INTO notes (id, text, created, expiration) VALUES (?1, ?2, ?3, ?4)",
            params![
                note.id.to_string(),
                note.text,
                note.created.timestamp_millis(),
                note.expiration
            ],
        )?;
        Ok(note)
    }

    fn get(&self, id: Uuid) -> StoreResult<Option<Note>> {
        let raw = self
            .conn()
            .query_row(
                &format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?1"),
                params![id.to_string()],
                note_from_row,
            )
            .optional()?;
        decode(raw)
    }

    fn list(&self) -> StoreResult<Vec<Note>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare(&format!("SELECT {NOTE_COLUMNS} FROM notes ORDER BY created, rowid"))?;
        let rows = stmt.query_map([], note_from_row)?;

        let mut notes = Vec::new();
        for raw in rows {
            notes.push(Note::try_from(raw?)?);
        }
        Ok(notes)
    }

    fn update(&self, id: Uuid, text: String) -> StoreResult<Option<Note>> {
        let raw = self
            .conn()
            .query_row(
                &format!("UPDATE notes SET text = ?1 WHERE id = ?2 RETURNING {NOTE_COLUMNS}"),
                params![text, id.to_string()],
                note_from_row,
            )
            .optional()?;
        decode(raw)
    }

    fn delete(&self, id: Uuid) -> StoreResult<Option<Note>> {
        let raw = self
            .conn()
            .query_row(
                &format!("DELETE FROM notes WHERE id = ?1 RETURNING {NOTE_COLUMNS}"),
                params![id.to_string()],
                note_from_row,
            )
            .optional()?;
        decode(raw)
    }

    fn clear_expired(&self) -> StoreResult<usize> {
        let now_ms = Utc::now().timestamp_millis();
        let removed = self.conn().execute(
            "DELETE FROM notes WHERE created + expiration * 60000 <= ?1",
            params![now_ms],
        )?;
        Ok(removed)
    }

    fn len(&self) -> StoreResult<usize> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))?;
        usize::try_from(count).map_err(|e| StoreError::Corrupt(e.to_string()))
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    fn store() -> SqliteNoteStore {
        SqliteNoteStore::open_in_memory().unwrap()
    }

    #[test]
    fn test_create_and_get() {
        let store = store();
        let id = Uuid::new_v4();

        let created = store.create(id, "hello".to_string(), 10).unwrap();
        let fetched = store.get(id).unwrap().unwrap();

        assert_eq!(fetched.id, id);
        assert_eq!(fetched.text, "hello");
        assert_eq!(fetched.expiration, 10);
        assert_eq!(fetched, created);
    }

    #[test]
    fn test_get_nonexistent_is_none() {
        assert!(store().get(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn test_list_orders_by_created() {
        let store = store();
        let mut ids = Vec::new();
        for text in ["first", "second", "third"] {
            let id = Uuid::new_v4();
            store.create(id, text.to_string(), 5).unwrap();
            ids.push(id);
            sleep(Duration::from_millis(2));
        }

        let listed: Vec<Uuid> = store.list().unwrap().iter().map(|n| n.id).collect();
        assert_eq!(listed, ids);
    }

    #[test]
    fn test_update_preserves_created_and_expiration() {
        let store = store();
        let id = Uuid::new_v4();
        let before = store.create(id, "old".to_string(), 42).unwrap();

        let updated = store.update(id, "new".to_string()).unwrap().unwrap();

        assert_eq!(updated.id, id);
        assert_eq!(updated.text, "new");
        assert_eq!(updated.expiration, 42);
        assert_eq!(updated.created, before.created);
    }

    #[test]
    fn test_update_nonexistent_is_none() {
        let store = store();
        assert!(store
            .update(Uuid::new_v4(), "nothing".to_string())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_delete_returns_full_note() {
        let store = store();
        let id = Uuid::new_v4();
        store.create(id, "bye".to_string(), 9).unwrap();

        let removed = store.delete(id).unwrap().unwrap();
        assert_eq!(removed.text, "bye");
        assert_eq!(removed.expiration, 9);
        assert!(store.get(id).unwrap().is_none());
        assert!(store.delete(id).unwrap().is_none());
    }

    #[test]
    fn test_clear_expired() {
        let store = store();
        let dead = Uuid::new_v4();
        let alive = Uuid::new_v4();
        store.create(dead, "hello".to_string(), 0).unwrap();
        store.create(alive, "later".to_string(), 60).unwrap();

        assert!(store.get(dead).unwrap().is_some());
        assert_eq!(store.clear_expired().unwrap(), 1);
        assert!(store.get(dead).unwrap().is_none());
        assert!(store.get(alive).unwrap().is_some());
        assert_eq!(store.len().unwrap(), 1);
    }

    fn insert_backdated(store: &SqliteNoteStore, id: Uuid, age: chrono::Duration, expiration: u32) {
        let created = Utc::now() - age;
        store
            .conn()
            .execute(
                "INSERT INTO notes (id, text, created, expiration) VALUES (?1, 'old', ?2, ?3)",
                params![id.to_string(), created.timestamp_millis(), expiration],
            )
            .unwrap();
    }

    #[test]
    fn test_clear_expired_counts_minutes() {
        let store = store();
        let lapsed = Uuid::new_v4();
        let pending = Uuid::new_v4();
        insert_backdated(&store, lapsed, chrono::Duration::seconds(61), 1);
        insert_backdated(&store, pending, chrono::Duration::seconds(59), 1);

        assert_eq!(store.clear_expired().unwrap(), 1);
        assert!(store.get(lapsed).unwrap().is_none());
        assert!(store.get(pending).unwrap().is_some());
    }

    #[test]
    fn test_reopen_file_keeps_notes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.db");
        let id = Uuid::new_v4();

        {
            let store = SqliteNoteStore::open(&path).unwrap();
            store.create(id, "persisted".to_string(), 30).unwrap();
        }

        let store = SqliteNoteStore::open(&path).unwrap();
        assert_eq!(store.get(id).unwrap().unwrap().text, "persisted");
    }

    #[test]
    fn test_corrupt_row_is_a_store_fault() {
        let store = store();
        store
            .conn()
            .execute(
                "INSERT INTO notes (id, text, created, expiration) VALUES ('not-a-uuid', 'x', 0, 1)",
                [],
            )
            .unwrap();

        assert!(matches!(store.list(), Err(StoreError::Corrupt(_))));
    }
}
