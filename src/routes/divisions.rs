//! Division route handlers
//!
//! Read-only views of the system of record.

use crate::error::ApiResult;
use crate::models::{Division, SuccessResponse};
use crate::state::SharedState;
use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DivisionListResponse {
    pub divisions: Vec<Division>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DivisionResponse {
    pub division: Division,
}

/// List every division with its programs
pub async fn list_divisions(
    State(state): State<SharedState>,
) -> ApiResult<Json<SuccessResponse<DivisionListResponse>>> {
    let divisions = state.record.list_divisions().await?;
    debug!("Listing {} divisions", divisions.len());

    Ok(Json(SuccessResponse::with_data(
        format!("{} division(s).", divisions.len()),
        DivisionListResponse {
            count: divisions.len(),
            divisions,
        },
    )))
}

/// Get a division as stored, without any local draft
pub async fn get_division(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<SuccessResponse<DivisionResponse>>> {
    let division = state.record.get_division(id).await?;

    Ok(Json(SuccessResponse::with_data(
        "Division retrieved.",
        DivisionResponse { division },
    )))
}
