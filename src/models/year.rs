//! Academic years and per-year program selections

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// An academic year such as `2024-2025`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademicYear {
    pub id: i64,
    pub label: String,
    pub is_current: bool,
    pub created_at: DateTime<Utc>,
}

/// Selection of one program for one year.
///
/// Program and division names are copied in when the entry is written so a
/// later rename does not rewrite history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub academic_year_id: i64,
    pub program_id: i64,
    pub is_selected: bool,
    pub program_name: String,
    pub division_name: String,
    pub updated_at: DateTime<Utc>,
}

/// Upsert payload handed to the system of record
#[derive(Debug, Clone)]
pub struct ScheduleUpsert {
    pub academic_year_id: i64,
    pub program_id: i64,
    pub is_selected: bool,
    pub program_name: String,
    pub division_name: String,
}

/// Request to add an academic year with an explicit label
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateYearRequest {
    #[validate(length(min = 1, max = 32, message = "Year label must be between 1 and 32 characters"))]
    pub label: String,
}

/// Request to toggle a program selection
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleSelectionRequest {
    pub academic_year_id: i64,
    pub program_id: i64,
    pub is_selected: bool,
}

/// Query for schedule listings
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleQuery {
    pub year_id: Option<i64>,
}
