//! Program schedule route handlers

use crate::error::ApiResult;
use crate::models::{ScheduleEntry, ScheduleQuery, SuccessResponse, ToggleSelectionRequest};
use crate::schedule::view::ScheduleGrid;
use crate::schedule::ScheduleView;
use crate::state::SharedState;
use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleListResponse {
    pub entries: Vec<ScheduleEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryResponse {
    pub entry: ScheduleEntry,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridResponse {
    pub grid: ScheduleGrid,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridQuery {
    #[serde(default)]
    pub lock_previous: bool,
}

/// Toggle made from the grid, subject to the lock switch
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridToggleRequest {
    #[serde(default)]
    pub lock_previous: bool,
    #[serde(flatten)]
    pub toggle: ToggleSelectionRequest,
}

/// List selections, optionally for one year
pub async fn list_schedule(
    State(state): State<SharedState>,
    Query(query): Query<ScheduleQuery>,
) -> ApiResult<Json<SuccessResponse<ScheduleListResponse>>> {
    let entries = state.schedule.list_schedule(query.year_id).await?;

    Ok(Json(SuccessResponse::with_data(
        format!("{} schedule entr(ies).", entries.len()),
        ScheduleListResponse { entries },
    )))
}

/// Select or deselect a program for a year
pub async fn toggle_selection(
    State(state): State<SharedState>,
    Json(payload): Json<ToggleSelectionRequest>,
) -> ApiResult<Json<SuccessResponse<EntryResponse>>> {
    let entry = state
        .schedule
        .toggle_selection(payload.academic_year_id, payload.program_id, payload.is_selected)
        .await?;

    Ok(Json(SuccessResponse::with_data(
        "Schedule updated.",
        EntryResponse { entry },
    )))
}

/// Divisions, programs and years laid out as a grid
pub async fn get_grid(
    State(state): State<SharedState>,
    Query(query): Query<GridQuery>,
) -> ApiResult<Json<SuccessResponse<GridResponse>>> {
    let grid = ScheduleView::new(query.lock_previous)
        .grid(&state.record)
        .await?;
    debug!(
        "Schedule grid with {} years and {} divisions",
        grid.years.len(),
        grid.divisions.len()
    );

    Ok(Json(SuccessResponse::with_data(
        "Schedule grid.",
        GridResponse { grid },
    )))
}

pub async fn toggle_from_grid(
    State(state): State<SharedState>,
    Json(payload): Json<GridToggleRequest>,
) -> ApiResult<Json<SuccessResponse<EntryResponse>>> {
    let toggle = payload.toggle;
    let entry = ScheduleView::new(payload.lock_previous)
        .toggle(
            &state.schedule,
            toggle.academic_year_id,
            toggle.program_id,
            toggle.is_selected,
        )
        .await?;

    Ok(Json(SuccessResponse::with_data(
        "Schedule updated.",
        EntryResponse { entry },
    )))
}
