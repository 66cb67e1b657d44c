//! In-memory system of record
//!
//! Every operation runs under a single `RwLock` write guard, which is what
//! makes `set_current_year` and `delete_year` atomic here.

use crate::error::AppError;
use crate::models::{AcademicYear, Division, ScheduleEntry, ScheduleUpsert, Snapshot};
use crate::record::SystemOfRecord;
use async_trait::async_trait;
use chrono::Utc;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::info;

#[derive(Default)]
struct MemoryState {
    divisions: Vec<Division>,
    snapshots: Vec<Snapshot>,
    years: Vec<AcademicYear>,
    schedule: Vec<ScheduleEntry>,
    next_snapshot_id: i64,
    next_year_id: i64,
}

/// Thread-safe in-memory store
pub struct MemoryRecord {
    state: RwLock<MemoryState>,
    /// Simulated network outage
    offline: AtomicBool,
}

impl MemoryRecord {
    pub fn new() -> Self {
        Self::with_divisions(Vec::new())
    }

    /// Seed with divisions, assigning ids to any division or program without one
    pub fn with_divisions(mut divisions: Vec<Division>) -> Self {
        let mut next_division = divisions.iter().filter_map(|d| d.id).max().unwrap_or(0);
        let mut next_program = divisions
            .iter()
            .flat_map(|d| d.program_list.iter())
            .filter_map(|p| p.id)
            .max()
            .unwrap_or(0);

        for division in &mut divisions {
            if division.id.is_none() {
                next_division += 1;
                division.id = Some(next_division);
            }
            for program in &mut division.program_list {
                if program.id.is_none() {
                    next_program += 1;
                    program.id = Some(next_program);
                }
            }
        }

        Self {
            state: RwLock::new(MemoryState {
                divisions,
                ..Default::default()
            }),
            offline: AtomicBool::new(false),
        }
    }

    /// Load a `divisions.json` seed file (a JSON array of divisions)
    pub fn from_seed_file(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Cannot read seed file {}: {}", path.display(), e)))?;
        let divisions: Vec<Division> = serde_json::from_str(&raw)
            .map_err(|e| AppError::Config(format!("Invalid seed file {}: {}", path.display(), e)))?;
        info!("Seeded {} divisions from {}", divisions.len(), path.display());
        Ok(Self::with_divisions(divisions))
    }

    /// Make every call fail with `TransientIo` until switched back
    #[cfg(test)]
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Replace a stored division, standing in for an upstream rename
    #[cfg(test)]
    pub async fn replace_division(&self, division: Division) -> Result<(), AppError> {
        self.check_online()?;
        let mut state = self.state.write().await;
        let slot = state
            .divisions
            .iter_mut()
            .find(|d| d.id.is_some() && d.id == division.id)
            .ok_or_else(|| AppError::NotFound("Division not found".to_string()))?;
        *slot = division;
        Ok(())
    }

    fn check_online(&self) -> Result<(), AppError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AppError::TransientIo("system of record unreachable".to_string()));
        }
        Ok(())
    }
}

impl Default for MemoryRecord {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SystemOfRecord for MemoryRecord {
    async fn list_divisions(&self) -> Result<Vec<Division>, AppError> {
        self.check_online()?;
        Ok(self.state.read().await.divisions.clone())
    }

    async fn get_division(&self, id: i64) -> Result<Division, AppError> {
        self.check_online()?;
        let state = self.state.read().await;
        state
            .divisions
            .iter()
            .find(|d| d.id == Some(id))
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Division {} not found", id)))
    }

    async fn append_snapshot(&self, division: &Division) -> Result<Snapshot, AppError> {
        self.check_online()?;
        let mut state = self.state.write().await;
        state.next_snapshot_id += 1;
        let snapshot = Snapshot {
            id: state.next_snapshot_id,
            division_id: division.id,
            created_at: Utc::now(),
            division: division.clone(),
        };
        state.snapshots.push(snapshot.clone());
        Ok(snapshot)
    }

    async fn list_snapshots(&self, limit: usize) -> Result<Vec<Snapshot>, AppError> {
        self.check_online()?;
        let state = self.state.read().await;
        let mut list = state.snapshots.clone();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        list.truncate(limit);
        Ok(list)
    }

    async fn list_years(&self) -> Result<Vec<AcademicYear>, AppError> {
        self.check_online()?;
        Ok(self.state.read().await.years.clone())
    }

    async fn create_year(&self, label: &str) -> Result<AcademicYear, AppError> {
        self.check_online()?;
        let mut state = self.state.write().await;
        if state.years.iter().any(|y| y.label.eq_ignore_ascii_case(label)) {
            return Err(AppError::Conflict(format!("Academic year {} already exists", label)));
        }
        state.next_year_id += 1;
        let year = AcademicYear {
            id: state.next_year_id,
            label: label.to_string(),
            is_current: false,
            created_at: Utc::now(),
        };
        state.years.push(year.clone());
        Ok(year)
    }

    async fn set_current_year(&self, id: i64) -> Result<AcademicYear, AppError> {
        self.check_online()?;
        let mut state = self.state.write().await;
        if !state.years.iter().any(|y| y.id == id) {
            return Err(AppError::NotFound(format!("Academic year {} not found", id)));
        }
        for year in &mut state.years {
            year.is_current = year.id == id;
        }
        state
            .years
            .iter()
            .find(|y| y.id == id)
            .cloned()
            .ok_or_else(|| AppError::Internal("current year vanished".to_string()))
    }

    async fn delete_year(&self, id: i64) -> Result<(), AppError> {
        self.check_online()?;
        let mut state = self.state.write().await;
        let year = state
            .years
            .iter()
            .find(|y| y.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Academic year {} not found", id)))?;
        if year.is_current {
            return Err(AppError::Conflict("Cannot delete the current academic year".to_string()));
        }
        state.years.retain(|y| y.id != id);
        state.schedule.retain(|e| e.academic_year_id != id);
        Ok(())
    }

    async fn list_schedule(&self, year_id: Option<i64>) -> Result<Vec<ScheduleEntry>, AppError> {
        self.check_online()?;
        let state = self.state.read().await;
        Ok(state
            .schedule
            .iter()
            .filter(|e| year_id.map_or(true, |y| e.academic_year_id == y))
            .cloned()
            .collect())
    }

    async fn upsert_schedule_entry(&self, entry: ScheduleUpsert) -> Result<ScheduleEntry, AppError> {
        self.check_online()?;
        let mut state = self.state.write().await;
        if !state.years.iter().any(|y| y.id == entry.academic_year_id) {
            return Err(AppError::NotFound(format!(
                "Academic year {} not found",
                entry.academic_year_id
            )));
        }

        let now = Utc::now();
        if let Some(existing) = state.schedule.iter_mut().find(|e| {
            e.academic_year_id == entry.academic_year_id && e.program_id == entry.program_id
        }) {
            existing.is_selected = entry.is_selected;
            existing.program_name = entry.program_name;
            existing.division_name = entry.division_name;
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let created = ScheduleEntry {
            academic_year_id: entry.academic_year_id,
            program_id: entry.program_id,
            is_selected: entry.is_selected,
            program_name: entry.program_name,
            division_name: entry.division_name,
            updated_at: now,
        };
        state.schedule.push(created.clone());
        Ok(created)
    }
}
