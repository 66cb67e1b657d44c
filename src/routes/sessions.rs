//! Edit session route handlers
//!
//! One session per open editor. Every way out of a session, including
//! selecting another division, runs the guarded exit.

use crate::draft::form::{DivisionForm, FormEdit};
use crate::draft::overlay::DraftOverlay;
use crate::draft::{EditSession, ExitDecision, PresetAnswer, Selection};
use crate::error::ApiResult;
use crate::models::{ScheduleEntry, SuccessResponse};
use crate::state::SharedState;
use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

/// Snapshot of a session as the editor renders it
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub session_id: Uuid,
    pub form: DivisionForm,
    pub dirty: bool,
    pub autosave_pending: bool,
    /// Issues as they stand right now; saving is blocked while non-empty
    pub issues: Vec<String>,
}

impl SessionView {
    fn of(session_id: Uuid, session: &EditSession) -> Self {
        Self {
            session_id,
            form: session.form().clone(),
            dirty: session.is_dirty(),
            autosave_pending: session.autosave_pending(),
            issues: session.validate().issues,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EditBatch {
    pub edits: Vec<FormEdit>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SaveRequest {
    /// Fill placeholders into failing fields and save anyway
    #[serde(default)]
    pub force: bool,
}

/// Answer to the remediation prompt, sent up front
#[derive(Debug, Default, Deserialize)]
pub struct ExitRequest {
    pub confirm: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectRequest {
    #[serde(flatten)]
    pub selection: Selection,
    pub confirm: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImprovementRequest {
    pub program_index: usize,
    pub selected: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResponse {
    pub overlay: DraftOverlay,
    pub session: SessionView,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExitResponse {
    #[serde(flatten)]
    pub decision: ExitDecision,
    /// Present while the session stays open
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImprovementResponse {
    pub entry: ScheduleEntry,
}

/// Open an editor on a division, by id or by name
pub async fn open_session(
    State(state): State<SharedState>,
    Json(selection): Json<Selection>,
) -> ApiResult<Json<SuccessResponse<SessionView>>> {
    let session = EditSession::open(state.draft_context(), &selection, state.editor.autosave_debounce).await?;
    let name = session.form().division_name.clone();
    let view_session = SessionView::of(Uuid::nil(), &session);
    let session_id = state.insert_session(session).await;
    info!("Opened edit session {} on {}", session_id, name);

    Ok(Json(SuccessResponse::with_data(
        format!("Editing {}.", name),
        SessionView {
            session_id,
            ..view_session
        },
    )))
}

pub async fn get_session(
    State(state): State<SharedState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<SuccessResponse<SessionView>>> {
    let handle = state.session(session_id).await?;
    let session = handle.lock().await;

    Ok(Json(SuccessResponse::with_data(
        "Session retrieved.",
        SessionView::of(session_id, &session),
    )))
}

/// Apply a batch of field edits; nothing changes unless every edit applies
pub async fn apply_edits(
    State(state): State<SharedState>,
    Path(session_id): Path<Uuid>,
    Json(batch): Json<EditBatch>,
) -> ApiResult<Json<SuccessResponse<SessionView>>> {
    let handle = state.session(session_id).await?;
    let mut session = handle.lock().await;

    let count = batch.edits.len();
    session.apply_all(batch.edits)?;
    debug!("Applied {} edit(s) to session {}", count, session_id);

    Ok(Json(SuccessResponse::with_data(
        format!("{} edit(s) applied.", count),
        SessionView::of(session_id, &session),
    )))
}

/// Commit the draft; the snapshot push continues in the background
pub async fn save_session(
    State(state): State<SharedState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<SaveRequest>,
) -> ApiResult<Json<SuccessResponse<SaveResponse>>> {
    let handle = state.session(session_id).await?;
    let mut session = handle.lock().await;

    let committed = session.save(request.force)?;

    Ok(Json(SuccessResponse::with_data(
        "All changes saved.",
        SaveResponse {
            overlay: committed.overlay,
            session: SessionView::of(session_id, &session),
        },
    )))
}

/// Clear local edits and reload from the system of record
pub async fn reset_session(
    State(state): State<SharedState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<SuccessResponse<SessionView>>> {
    let handle = state.session(session_id).await?;
    let mut session = handle.lock().await;

    session.reset().await?;

    Ok(Json(SuccessResponse::with_data(
        "Cleared local edits.",
        SessionView::of(session_id, &session),
    )))
}

/// Leave the editor; the session closes only when the exit proceeds
pub async fn exit_session(
    State(state): State<SharedState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<ExitRequest>,
) -> ApiResult<Json<SuccessResponse<ExitResponse>>> {
    let handle = state.session(session_id).await?;
    let mut session = handle.lock().await;

    let decision = session.guarded_exit(&PresetAnswer(request.confirm)).await?;
    let response = match decision {
        ExitDecision::Proceed => {
            drop(session);
            state.remove_session(session_id).await;
            info!("Closed edit session {}", session_id);
            ExitResponse {
                decision,
                session: None,
            }
        }
        ExitDecision::Cancelled { .. } => ExitResponse {
            session: Some(SessionView::of(session_id, &session)),
            decision,
        },
    };

    Ok(Json(SuccessResponse::with_data("Exit checked.", response)))
}

/// Switch the session to another division
pub async fn select_division(
    State(state): State<SharedState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<SelectRequest>,
) -> ApiResult<Json<SuccessResponse<ExitResponse>>> {
    let handle = state.session(session_id).await?;
    let mut session = handle.lock().await;

    let decision = session
        .switch_to(&request.selection, &PresetAnswer(request.confirm))
        .await?;

    Ok(Json(SuccessResponse::with_data(
        "Selection checked.",
        ExitResponse {
            decision,
            session: Some(SessionView::of(session_id, &session)),
        },
    )))
}

/// Mark a program for improvement in the current academic year
pub async fn toggle_improvement(
    State(state): State<SharedState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<ImprovementRequest>,
) -> ApiResult<Json<SuccessResponse<ImprovementResponse>>> {
    let handle = state.session(session_id).await?;
    let session = handle.lock().await;

    let entry = session
        .toggle_improvement(&state.schedule, request.program_index, request.selected)
        .await?;

    Ok(Json(SuccessResponse::with_data(
        if entry.is_selected {
            "Marked for improvement."
        } else {
            "No longer marked for improvement."
        },
        ImprovementResponse { entry },
    )))
}
