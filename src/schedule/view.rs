//! Program × year grid shown on the schedule page
//!
//! The "lock previous years" switch only restricts toggles made through this
//! view. `ScheduleManager::toggle_selection` still accepts any year.

use crate::error::AppError;
use crate::models::{AcademicYear, Division, ScheduleEntry};
use crate::record::SharedRecord;
use crate::schedule::ScheduleManager;
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearColumn {
    pub id: i64,
    pub label: String,
    pub is_current: bool,
    pub locked: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridProgram {
    pub program_id: Option<i64>,
    pub program_name: String,
    /// One flag per year column, in column order
    pub selected: Vec<bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridDivision {
    pub division_name: String,
    pub programs: Vec<GridProgram>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleGrid {
    pub lock_previous: bool,
    pub years: Vec<YearColumn>,
    pub divisions: Vec<GridDivision>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScheduleView {
    pub lock_previous: bool,
}

impl ScheduleView {
    pub fn new(lock_previous: bool) -> Self {
        Self { lock_previous }
    }

    pub async fn grid(&self, record: &SharedRecord) -> Result<ScheduleGrid, AppError> {
        let years = record.list_years().await?;
        let divisions = record.list_divisions().await?;
        let entries = record.list_schedule(None).await?;
        Ok(self.build_grid(years, &divisions, &entries))
    }

    pub fn build_grid(
        &self,
        mut years: Vec<AcademicYear>,
        divisions: &[Division],
        entries: &[ScheduleEntry],
    ) -> ScheduleGrid {
        years.sort_by_key(|y| y.id);
        let selected: HashSet<(i64, i64)> = entries
            .iter()
            .filter(|e| e.is_selected)
            .map(|e| (e.academic_year_id, e.program_id))
            .collect();

        let divisions = divisions
            .iter()
            .map(|d| GridDivision {
                division_name: d.division_name.clone(),
                programs: d
                    .program_list
                    .iter()
                    .map(|p| GridProgram {
                        program_id: p.id,
                        program_name: p.program_name.clone(),
                        selected: years
                            .iter()
                            .map(|y| p.id.is_some_and(|pid| selected.contains(&(y.id, pid))))
                            .collect(),
                    })
                    .collect(),
            })
            .collect();

        let years = years
            .into_iter()
            .map(|y| YearColumn {
                locked: self.lock_previous && !y.is_current,
                id: y.id,
                label: y.label,
                is_current: y.is_current,
            })
            .collect();

        ScheduleGrid {
            lock_previous: self.lock_previous,
            years,
            divisions,
        }
    }

    /// Toggle from the grid, refused for locked years
    pub async fn toggle(
        &self,
        manager: &ScheduleManager,
        year_id: i64,
        program_id: i64,
        selected: bool,
    ) -> Result<ScheduleEntry, AppError> {
        if self.lock_previous {
            let current = manager.current_year().await?;
            if current.map(|y| y.id) != Some(year_id) {
                return Err(AppError::Conflict(format!(
                    "Academic year {} is locked; unlock previous years to edit it",
                    year_id
                )));
            }
        }
        manager.toggle_selection(year_id, program_id, selected).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Program;
    use crate::record::{MemoryRecord, SystemOfRecord};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn seeded() -> Arc<MemoryRecord> {
        Arc::new(MemoryRecord::with_divisions(vec![Division {
            id: Some(1),
            division_name: "Arts".to_string(),
            program_list: vec![
                Program {
                    id: Some(10),
                    program_name: "Music".to_string(),
                    ..Default::default()
                },
                Program {
                    program_name: "Unsaved".to_string(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }]))
    }

    #[tokio::test]
    async fn test_grid_marks_selected_and_locked() {
        let record = seeded();
        let manager = ScheduleManager::new(record.clone(), "2024-2025");
        let old = manager.add_next_year().await.unwrap();
        let new = manager.add_next_year().await.unwrap();
        manager.set_current_year(new.id).await.unwrap();
        manager.toggle_selection(old.id, 10, true).await.unwrap();

        let shared: SharedRecord = record.clone();
        let grid = ScheduleView::new(true).grid(&shared).await.unwrap();

        let locks: Vec<_> = grid.years.iter().map(|y| (y.label.as_str(), y.locked)).collect();
        assert_eq!(locks, vec![("2024-2025", true), ("2025-2026", false)]);
        let music = &grid.divisions[0].programs[0];
        assert_eq!(music.selected, vec![true, false]);
        // programs without an id never show as selected
        assert_eq!(grid.divisions[0].programs[1].program_id, None);
        assert_eq!(grid.divisions[0].programs[1].selected, vec![false, false]);
    }

    #[tokio::test]
    async fn test_lock_gates_view_but_not_manager() {
        let record = seeded();
        let manager = ScheduleManager::new(record.clone(), "2024-2025");
        let old = manager.add_next_year().await.unwrap();
        let new = manager.add_next_year().await.unwrap();
        manager.set_current_year(new.id).await.unwrap();

        let locked = ScheduleView::new(true);
        let err = locked.toggle(&manager, old.id, 10, true).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert!(locked.toggle(&manager, new.id, 10, true).await.is_ok());

        assert!(ScheduleView::new(false).toggle(&manager, old.id, 10, true).await.is_ok());
        assert!(manager.toggle_selection(old.id, 10, false).await.is_ok());
        assert_eq!(record.list_schedule(Some(old.id)).await.unwrap().len(), 1);
    }
}
