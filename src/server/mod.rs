//! # HTTP Front End
//!
//! Serves the two tabs as server-rendered pages. Each browser gets a session
//! keyed by the `dst_session` cookie; requests of one session are serialized
//! by that session's mutex, different sessions run independently.
use crate::workflow::session::Session;
use crate::workflow::Workflow;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::routing::post;
use axum::Router;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::PoisonError;
use std::time::Duration;
use std::time::Instant;
use tokio::sync::Mutex;
use uuid::Uuid;

mod handlers;
mod page;

pub const SESSION_COOKIE: &str = "dst_session";

/// Sessions idle longer than this are dropped
const SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(12 * 60 * 60);

struct SessionEntry {
    session: Arc<Mutex<Session>>,
    last_seen: Instant,
}

/// In-memory sessions of all connected browsers.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<std::sync::Mutex<HashMap<Uuid, SessionEntry>>>,
}

impl SessionStore {
    /// Returns the session for `id`, or a fresh one under a new id if `id` is unknown.
    pub fn resolve(&self, id: Option<Uuid>) -> (Uuid, Arc<Mutex<Session>>) {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        sessions.retain(|_, entry| now.duration_since(entry.last_seen) < SESSION_IDLE_TIMEOUT);

        if let Some(id) = id {
            if let Some(entry) = sessions.get_mut(&id) {
                entry.last_seen = now;
                return (id, entry.session.clone());
            }
        }

        let id = Uuid::new_v4();
        let session = Arc::new(Mutex::new(Session::default()));
        sessions.insert(id, SessionEntry { session: session.clone(), last_seen: now });
        tracing::debug!(session = %id, active = sessions.len(), "session created");
        (id, session)
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone)]
pub struct AppState {
    pub workflow: Arc<Workflow>,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(workflow: Workflow) -> AppState {
        AppState {
            workflow: Arc::new(workflow),
            sessions: SessionStore::default(),
        }
    }
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/intake", get(handlers::intake_page).post(handlers::intake_upload))
        .route("/intake/archive", post(handlers::intake_archive))
        .route("/amend", get(handlers::amend_page).post(handlers::amend_submit))
        .route("/amend/download", get(handlers::download))
        .route("/healthz", get(handlers::healthz))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}
