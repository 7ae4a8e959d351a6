//! API Module
//!
//! HTTP handlers, middleware and routing for the notes REST API.
//!
//! # Endpoints
//! - `GET /note/` - List notes
//! - `POST /note/` - Create a note
//! - `GET /note/:uid` - Fetch a note
//! - `PATCH /note/:uid` - Replace a note's text
//! - `DELETE /note/:uid` - Delete a note
//! - `DELETE /note/api/` - Pop a note
//! - `GET /note/api/?id=` - Check whether a note exists
//! - `GET /stats` - Store and limiter counters
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod middleware;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
