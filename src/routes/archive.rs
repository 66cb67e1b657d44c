//! Snapshot history route handlers
//!
//! Listings, the recent-changes feed, per-period archive buckets and a
//! pairwise diff. All of them read the same bounded window of snapshots.

use crate::error::{not_found_error, validation_error, ApiResult};
use crate::models::{DiffQuery, LimitQuery, Snapshot, SnapshotRow, SuccessResponse};
use crate::snapshot::archive::{ArchiveBucket, RecentChange};
use crate::snapshot::diff::SnapshotDiff;
use crate::snapshot::{diff, group_by_period, recent_changes};
use crate::state::SharedState;
use axum::{
    extract::{Query, State},
    Json,
};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionListResponse {
    pub submissions: Vec<SnapshotRow>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentChangesResponse {
    pub changes: Vec<RecentChange>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveResponse {
    pub buckets: Vec<ArchiveBucket>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResponse {
    pub from: SnapshotRow,
    pub to: SnapshotRow,
    pub diff: SnapshotDiff,
}

async fn load_window(state: &SharedState, limit: Option<usize>) -> ApiResult<Vec<Snapshot>> {
    let limit = limit
        .unwrap_or(state.editor.snapshot_list_limit)
        .min(state.editor.snapshot_list_limit);
    let snapshots = state.record.list_snapshots(limit).await?;
    debug!("Loaded {} snapshots (limit {})", snapshots.len(), limit);
    Ok(snapshots)
}

/// List saved snapshots, newest first
pub async fn list_submissions(
    State(state): State<SharedState>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Json<SuccessResponse<SubmissionListResponse>>> {
    let snapshots = load_window(&state, query.limit).await?;
    let submissions: Vec<SnapshotRow> = snapshots.iter().map(SnapshotRow::from).collect();

    Ok(Json(SuccessResponse::with_data(
        format!("{} submission(s).", submissions.len()),
        SubmissionListResponse {
            count: submissions.len(),
            submissions,
        },
    )))
}

pub async fn list_recent_changes(
    State(state): State<SharedState>,
) -> ApiResult<Json<SuccessResponse<RecentChangesResponse>>> {
    let snapshots = load_window(&state, None).await?;
    let changes = recent_changes(&snapshots, state.editor.recent_changes_shown);

    Ok(Json(SuccessResponse::with_data(
        "Recent changes.",
        RecentChangesResponse { changes },
    )))
}

/// Snapshots bucketed by academic period and division
pub async fn get_archive(
    State(state): State<SharedState>,
) -> ApiResult<Json<SuccessResponse<ArchiveResponse>>> {
    let snapshots = load_window(&state, None).await?;
    let buckets = group_by_period(&snapshots, state.editor.fiscal_boundary_month);

    Ok(Json(SuccessResponse::with_data(
        format!("{} archive bucket(s).", buckets.len()),
        ArchiveResponse { buckets },
    )))
}

/// Compare two snapshots of the same division
pub async fn diff_submissions(
    State(state): State<SharedState>,
    Query(query): Query<DiffQuery>,
) -> ApiResult<Json<SuccessResponse<DiffResponse>>> {
    let snapshots = load_window(&state, None).await?;
    let find = |id: i64| {
        snapshots
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| not_found_error(format!("Snapshot {} not found", id)))
    };
    let from = find(query.from)?;
    let to = find(query.to)?;

    if from.entity_key() != to.entity_key() {
        return Err(validation_error(
            "Snapshots belong to different divisions and cannot be compared",
        ));
    }

    Ok(Json(SuccessResponse::with_data(
        "Snapshot diff.",
        DiffResponse {
            from: SnapshotRow::from(from),
            to: SnapshotRow::from(to),
            diff: diff(from, to),
        },
    )))
}
