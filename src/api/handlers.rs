//! API Handlers
//!
//! HTTP request handlers for each note server endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{ApiError, Result, StoreResult};
use crate::limiter::VisitorLimiter;
use crate::models::{
    CreateNoteRequest, HealthResponse, NoteIdRequest, PeekResponse, PurgerReport, StatsResponse,
    UpdateNoteRequest,
};
use crate::notes::{Note, NoteStore};
use crate::tasks::PurgerStatus;

/// Application state shared across all handlers.
///
/// The note store and the visitor limiter each carry their own lock; they
/// are never guarded together.
#[derive(Clone)]
pub struct AppState {
    /// Note store, in-memory or SQLite
    pub notes: Arc<dyn NoteStore>,
    /// Per-client rate limiter
    pub limiter: Arc<VisitorLimiter>,
    /// Bearer token for guarded routes
    pub auth_token: Option<Arc<str>>,
    /// Origins allowed by CORS
    pub allowed_origins: Arc<[String]>,
    /// Background purgers reported by /health and /stats
    pub purgers: Vec<PurgerStatus>,
}

impl AppState {
    /// Creates a new AppState with no auth token, no CORS origins and no
    /// purgers attached.
    pub fn new(notes: Arc<dyn NoteStore>, limiter: Arc<VisitorLimiter>) -> Self {
        Self {
            notes,
            limiter,
            auth_token: None,
            allowed_origins: Arc::from(Vec::new()),
            purgers: Vec::new(),
        }
    }

    /// Creates a new AppState from configuration.
    pub fn from_config(config: &Config, notes: Arc<dyn NoteStore>) -> Self {
        let limiter = Arc::new(VisitorLimiter::new(config.limiter()));
        let mut state = Self::new(notes, limiter);
        state.auth_token = config.auth_token.as_deref().map(Arc::from);
        state.allowed_origins = Arc::from(config.allowed_origins.clone());
        state
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(Arc::from(token.into()));
        self
    }

    /// Registers a purger for health reporting.
    pub fn with_purger(mut self, status: PurgerStatus) -> Self {
        self.purgers.push(status);
        self
    }

    fn purger_reports(&self) -> Vec<PurgerReport> {
        self.purgers.iter().map(PurgerReport::from).collect()
    }
}

/// Runs a store operation on the blocking pool so SQLite I/O never stalls
/// the async workers.
async fn with_store<T, F>(state: &AppState, f: F) -> Result<T>
where
    F: FnOnce(&dyn NoteStore) -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(&state.notes);
    tokio::task::spawn_blocking(move || f(store.as_ref()))
        .await
        .map_err(|e| ApiError::Internal(format!("store task failed: {e}")))?
        .map_err(ApiError::from)
}

fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::InvalidRequest(format!("'{raw}' is not a UUID")))
}

/// Handler for GET /note/
pub async fn list_notes(State(state): State<AppState>) -> Result<Json<Vec<Note>>> {
    let notes = with_store(&state, |store| store.list()).await?;
    Ok(Json(notes))
}

/// Handler for POST /note/
///
/// The server picks the id; the client only supplies text and expiration.
pub async fn create_note(
    State(state): State<AppState>,
    Json(req): Json<CreateNoteRequest>,
) -> Result<(StatusCode, Json<Note>)> {
    if let Some(error_msg) = req.validate() {
        return Err(ApiError::InvalidRequest(error_msg));
    }

    let id = Uuid::new_v4();
    let note = with_store(&state, move |store| store.create(id, req.text, req.expiration)).await?;

    Ok((StatusCode::CREATED, Json(note)))
}

/// Handler for GET /note/:uid
pub async fn get_note(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<Json<Note>> {
    let id = parse_id(&uid)?;
    with_store(&state, move |store| store.get(id))
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound(uid))
}

/// Handler for PATCH /note/:uid
pub async fn update_note(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Json(req): Json<UpdateNoteRequest>,
) -> Result<Json<Note>> {
    let id = parse_id(&uid)?;
    if let Some(error_msg) = req.validate() {
        return Err(ApiError::InvalidRequest(error_msg));
    }

    with_store(&state, move |store| store.update(id, req.text))
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound(uid))
}

/// Handler for DELETE /note/:uid
pub async fn delete_note(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<StatusCode> {
    let id = parse_id(&uid)?;
    match with_store(&state, move |store| store.delete(id)).await? {
        Some(_) => Ok(StatusCode::NO_CONTENT),
        None => Err(ApiError::NotFound(uid)),
    }
}

/// Handler for DELETE /note/api/
///
/// Removes a note and hands it back in one step.
pub async fn pop_note(
    State(state): State<AppState>,
    Json(req): Json<NoteIdRequest>,
) -> Result<Json<Note>> {
    let id = req.id;
    with_store(&state, move |store| store.delete(id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(id.to_string()))
}

/// Handler for GET /note/api/?id=
///
/// Reports whether a note exists without revealing its text.
pub async fn peek_note(
    State(state): State<AppState>,
    Query(req): Query<NoteIdRequest>,
) -> Result<(StatusCode, Json<PeekResponse>)> {
    let id = req.id;
    let exist = with_store(&state, move |store| store.get(id))
        .await?
        .is_some();
    let status = if exist {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    };
    Ok((status, Json(PeekResponse { exist })))
}

/// Handler for GET /health
///
/// Answers 503 once any purger has given up, so operators notice that
/// expired notes or stale visitors are piling up.
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let health = HealthResponse::from_purgers(state.purger_reports());
    let status = if health.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(health))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let notes = with_store(&state, |store| store.len()).await?;
    Ok(Json(StatsResponse {
        notes,
        visitors: state.limiter.len(),
        purgers: state.purger_reports(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notes::MemoryNoteStore;
    use crate::tasks::{Purger, PurgerConfig, PurgerState};

    fn test_state() -> AppState {
        AppState::new(
            Arc::new(MemoryNoteStore::new()),
            Arc::new(VisitorLimiter::default()),
        )
    }

    fn create_req(text: &str, expiration: u32) -> Json<CreateNoteRequest> {
        Json(CreateNoteRequest {
            text: text.to_string(),
            expiration,
        })
    }

    #[tokio::test]
    async fn test_create_and_get_note() {
        let state = test_state();

        let (status, Json(created)) = create_note(State(state.clone()), create_req("hello", 5))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CREATED);

        let Json(fetched) = get_note(State(state), Path(created.id.to_string()))
            .await
            .unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_get_missing_note() {
        let result = get_note(State(test_state()), Path(Uuid::new_v4().to_string())).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_get_bad_uuid() {
        let result = get_note(State(test_state()), Path("nope".to_string())).await;
        assert!(matches!(result, Err(ApiError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_update_note() {
        let state = test_state();
        let (_, Json(created)) = create_note(State(state.clone()), create_req("old", 5))
            .await
            .unwrap();

        let Json(updated) = update_note(
            State(state),
            Path(created.id.to_string()),
            Json(UpdateNoteRequest {
                text: "new".to_string(),
            }),
        )
        .await
        .unwrap();

        assert_eq!(updated.text, "new");
        assert_eq!(updated.created, created.created);
    }

    #[tokio::test]
    async fn test_delete_then_pop_missing() {
        let state = test_state();
        let (_, Json(created)) = create_note(State(state.clone()), create_req("x", 5))
            .await
            .unwrap();

        let status = delete_note(State(state.clone()), Path(created.id.to_string()))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        let popped = pop_note(State(state), Json(NoteIdRequest { id: created.id })).await;
        assert!(matches!(popped, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_peek_note() {
        let state = test_state();
        let (_, Json(created)) = create_note(State(state.clone()), create_req("x", 5))
            .await
            .unwrap();

        let (status, Json(body)) =
            peek_note(State(state.clone()), Query(NoteIdRequest { id: created.id }))
                .await
                .unwrap();
        assert_eq!(status, StatusCode::OK);
        assert!(body.exist);

        let (status, Json(body)) = peek_note(State(state), Query(NoteIdRequest { id: Uuid::new_v4() }))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(!body.exist);
    }

    #[tokio::test]
    async fn test_health_reports_exhausted_purger() {
        let mut purger = Purger::new(
            "notes",
            PurgerConfig::new(std::time::Duration::from_millis(5), 1),
            || Err::<usize, _>("down"),
        );
        let state = test_state().with_purger(purger.status());

        let (status, _) = health_handler(State(state.clone())).await;
        assert_eq!(status, StatusCode::OK);

        purger.start().unwrap();
        purger.done().await;
        assert_eq!(purger.state(), PurgerState::Exhausted);

        let (status, Json(body)) = health_handler(State(state)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.status, "degraded");
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let state = test_state();
        create_note(State(state.clone()), create_req("a", 5))
            .await
            .unwrap();
        state.limiter.admit("127.0.0.1");

        let Json(stats) = stats_handler(State(state)).await.unwrap();
        assert_eq!(stats.notes, 1);
        assert_eq!(stats.visitors, 1);
    }
}
