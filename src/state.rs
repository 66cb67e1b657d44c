//! Application state management
//!
//! Contains shared state accessible across all handlers.

use crate::config::EditorConfig;
use crate::draft::{DraftContext, EditSession, OverlayStore};
use crate::error::AppError;
use crate::record::SharedRecord;
use crate::schedule::ScheduleManager;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// Application state shared across all handlers
pub struct AppState {
    /// The system of record (Postgres or in-memory)
    pub record: SharedRecord,

    /// Local draft overlays, shared by every session
    pub overlays: Arc<OverlayStore>,

    /// Academic years and program selections
    pub schedule: ScheduleManager,

    /// Open edit sessions. The map lock is only held to look a session up;
    /// work on a session holds that session's own lock.
    pub sessions: RwLock<HashMap<Uuid, SessionHandle>>,

    pub editor: EditorConfig,
}

impl AppState {
    pub fn new(record: SharedRecord, overlays: Arc<OverlayStore>, editor: EditorConfig) -> Self {
        let schedule = ScheduleManager::new(Arc::clone(&record), editor.default_year_label.clone());
        Self {
            record,
            overlays,
            schedule,
            sessions: RwLock::new(HashMap::new()),
            editor,
        }
    }

    pub fn draft_context(&self) -> DraftContext {
        DraftContext::new(Arc::clone(&self.overlays), Arc::clone(&self.record))
    }

    /// Register a freshly opened session
    pub async fn insert_session(&self, session: EditSession) -> Uuid {
        let id = Uuid::new_v4();
        self.sessions
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(session)));
        id
    }

    pub async fn session(&self, id: Uuid) -> Result<SessionHandle, AppError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Edit session {} not found", id)))
    }

    pub async fn remove_session(&self, id: Uuid) {
        self.sessions.write().await.remove(&id);
    }
}

/// One open session, locked independently of every other
pub type SessionHandle = Arc<Mutex<EditSession>>;

/// Type alias for shared state
pub type SharedState = Arc<AppState>;
