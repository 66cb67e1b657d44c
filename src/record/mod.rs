//! System of record
//!
//! Everything the core reads from or commits to lives behind
//! [`SystemOfRecord`]. Postgres backs it in production (`crate::db`), the
//! in-memory store backs development and tests.

pub mod memory;

pub use memory::MemoryRecord;

use crate::error::AppError;
use crate::models::{AcademicYear, Division, ScheduleEntry, ScheduleUpsert, Snapshot};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Request/response interface to the authoritative store
#[async_trait]
pub trait SystemOfRecord: Send + Sync {
    async fn list_divisions(&self) -> Result<Vec<Division>, AppError>;

    /// Fails with `NotFound` for an unknown id
    async fn get_division(&self, id: i64) -> Result<Division, AppError>;

    async fn append_snapshot(&self, division: &Division) -> Result<Snapshot, AppError>;

    /// Newest first, at most `limit`
    async fn list_snapshots(&self, limit: usize) -> Result<Vec<Snapshot>, AppError>;

    /// Oldest first (creation order)
    async fn list_years(&self) -> Result<Vec<AcademicYear>, AppError>;

    async fn create_year(&self, label: &str) -> Result<AcademicYear, AppError>;

    /// Must clear every other current flag and set the target as one atomic unit
    async fn set_current_year(&self, id: i64) -> Result<AcademicYear, AppError>;

    /// Must refuse the current year and cascade its schedule rows atomically
    async fn delete_year(&self, id: i64) -> Result<(), AppError>;

    async fn list_schedule(&self, year_id: Option<i64>) -> Result<Vec<ScheduleEntry>, AppError>;

    async fn upsert_schedule_entry(&self, entry: ScheduleUpsert) -> Result<ScheduleEntry, AppError>;
}

/// Type alias for the shared backend
pub type SharedRecord = Arc<dyn SystemOfRecord>;

/// Resolve a division the way the editor opens one: by id first, then by
/// name across the full list, and finally a blank division carrying the
/// requested name.
pub async fn resolve_division(
    record: &dyn SystemOfRecord,
    id: Option<i64>,
    name: Option<&str>,
) -> Result<Division, AppError> {
    if let Some(id) = id.filter(|id| *id > 0) {
        match record.get_division(id).await {
            Ok(division) => return Ok(division),
            Err(AppError::NotFound(_)) => {
                debug!("Division {} not found by id, falling back to name lookup", id);
            }
            Err(e) if e.is_transient() => {
                warn!("Fetching division {} failed ({}), falling back to name lookup", id, e);
            }
            Err(e) => return Err(e),
        }
    }

    let wanted = name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .or_else(|| id.map(|id| id.to_string()))
        .unwrap_or_default();
    let key = wanted.to_lowercase();

    let all = record.list_divisions().await?;
    let found = all
        .into_iter()
        .find(|d| !key.is_empty() && d.division_name.trim().to_lowercase() == key);

    Ok(found.unwrap_or_else(|| Division::named(wanted)))
}
