//! Immutable division snapshots appended on every commit

use crate::models::Division;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamped full copy of a division's effective state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub id: i64,
    pub division_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub division: Division,
}

impl Snapshot {
    /// Identity used to chain snapshots of the same division over time
    pub fn entity_key(&self) -> String {
        match self.division_id {
            Some(id) => format!("id:{}", id),
            None => format!("name:{}", self.division.division_name.trim().to_lowercase()),
        }
    }

    pub fn program_count(&self) -> usize {
        self.division.program_list.len()
    }

    pub fn payee_count(&self) -> usize {
        self.division.payee_count()
    }

    pub fn total_amount(&self) -> f64 {
        self.division.total_amount()
    }
}

/// Flat listing row, the shape the history table reads
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRow {
    pub id: i64,
    pub division_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub division_name: String,
    pub dean: String,
    pub chair: String,
    pub pen: String,
    pub loc: String,
    pub notes: String,
    pub program_count: usize,
    pub payee_count: usize,
    pub total_amount: f64,
}

impl From<&Snapshot> for SnapshotRow {
    fn from(snapshot: &Snapshot) -> Self {
        let d = &snapshot.division;
        Self {
            id: snapshot.id,
            division_id: snapshot.division_id,
            created_at: snapshot.created_at,
            division_name: d.division_name.clone(),
            dean: d.dean_name.clone(),
            chair: d.chair_name.clone(),
            pen: d.pen_contact.clone(),
            loc: d.loc_rep.clone(),
            notes: d.notes.clone(),
            program_count: snapshot.program_count(),
            payee_count: snapshot.payee_count(),
            total_amount: snapshot.total_amount(),
        }
    }
}

/// Query for snapshot listings
#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

/// Pair of snapshots to compare, older first
#[derive(Debug, Deserialize)]
pub struct DiffQuery {
    pub from: i64,
    pub to: i64,
}
