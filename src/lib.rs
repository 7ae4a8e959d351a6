//! Onenote - short-lived text notes over HTTP
//!
//! Notes carry a per-note time to live and are swept in the background.
//! Each client is rate limited by its own token bucket.

pub mod api;
pub mod config;
pub mod error;
pub mod limiter;
pub mod models;
pub mod notes;
pub mod tasks;

pub use api::{create_router, AppState};
pub use config::Config;
pub use error::{ApiError, PurgerError, StoreError};
pub use limiter::VisitorLimiter;
pub use notes::{MemoryNoteStore, Note, NoteStore, SqliteNoteStore};
pub use tasks::{Purger, PurgerConfig, PurgerState};
