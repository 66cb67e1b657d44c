//! Academic year route handlers

use crate::error::{validation_error, ApiResult};
use crate::models::{AcademicYear, CreateYearRequest, MessageResponse, SuccessResponse};
use crate::state::SharedState;
use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use tracing::info;
use validator::Validate;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearListResponse {
    pub years: Vec<AcademicYear>,
    pub current: Option<AcademicYear>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearResponse {
    pub year: AcademicYear,
}

/// List years in creation order along with the current one
pub async fn list_years(
    State(state): State<SharedState>,
) -> ApiResult<Json<SuccessResponse<YearListResponse>>> {
    let years = state.schedule.list_years().await?;
    let current = years.iter().find(|y| y.is_current).cloned();

    Ok(Json(SuccessResponse::with_data(
        format!("{} academic year(s).", years.len()),
        YearListResponse { years, current },
    )))
}

/// Add a year with an explicit label
pub async fn create_year(
    State(state): State<SharedState>,
    Json(payload): Json<CreateYearRequest>,
) -> ApiResult<Json<SuccessResponse<YearResponse>>> {
    payload
        .validate()
        .map_err(|e| validation_error(e.to_string()))?;

    let year = state.schedule.add_year(&payload.label).await?;

    Ok(Json(SuccessResponse::with_data(
        format!("Academic year {} added.", year.label),
        YearResponse { year },
    )))
}

/// Add the year following the most recently created one
pub async fn create_next_year(
    State(state): State<SharedState>,
) -> ApiResult<Json<SuccessResponse<YearResponse>>> {
    let year = state.schedule.add_next_year().await?;

    Ok(Json(SuccessResponse::with_data(
        format!("Academic year {} added.", year.label),
        YearResponse { year },
    )))
}

pub async fn set_current_year(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<SuccessResponse<YearResponse>>> {
    let year = state.schedule.set_current_year(id).await?;

    Ok(Json(SuccessResponse::with_data(
        format!("{} is now the current year.", year.label),
        YearResponse { year },
    )))
}

/// Delete a year and its selections; the current year is refused
pub async fn delete_year(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<MessageResponse>> {
    state.schedule.delete_year(id).await?;
    info!("Deleted academic year {}", id);

    Ok(Json(MessageResponse::new(format!(
        "Academic year {} deleted.",
        id
    ))))
}

/// Remove the most recently created year unless it is current
pub async fn delete_latest_year(
    State(state): State<SharedState>,
) -> ApiResult<Json<SuccessResponse<YearResponse>>> {
    let year = state.schedule.remove_latest_year().await?;
    info!("Removed latest academic year {}", year.label);

    Ok(Json(SuccessResponse::with_data(
        format!("Academic year {} removed.", year.label),
        YearResponse { year },
    )))
}
