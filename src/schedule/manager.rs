//! Academic years and per-year program selections
//!
//! The manager talks only to the system of record. The single-current-year
//! rule is enforced by the record's atomic `set_current_year` and by refusing
//! to delete the current year.

use crate::error::{conflict_error, not_found_error, validation_error, AppError};
use crate::models::{AcademicYear, ScheduleEntry, ScheduleUpsert};
use crate::record::SharedRecord;
use crate::schedule::label::next_label;
use tracing::{debug, info, warn};

pub struct ScheduleManager {
    record: SharedRecord,
    /// Used by `add_next_year` when there is nothing usable to increment
    default_label: String,
}

impl ScheduleManager {
    pub fn new(record: SharedRecord, default_label: impl Into<String>) -> Self {
        Self {
            record,
            default_label: default_label.into(),
        }
    }

    /// All years, oldest first
    pub async fn list_years(&self) -> Result<Vec<AcademicYear>, AppError> {
        self.record.list_years().await
    }

    pub async fn current_year(&self) -> Result<Option<AcademicYear>, AppError> {
        Ok(self.record.list_years().await?.into_iter().find(|y| y.is_current))
    }

    pub async fn list_schedule(&self, year_id: Option<i64>) -> Result<Vec<ScheduleEntry>, AppError> {
        self.record.list_schedule(year_id).await
    }

    pub async fn set_current_year(&self, year_id: i64) -> Result<AcademicYear, AppError> {
        let year = self.record.set_current_year(year_id).await?;
        info!("Academic year {} is now current", year.label);
        Ok(year)
    }

    /// Fails with `Conflict` on the current year; cascades its selections
    pub async fn delete_year(&self, year_id: i64) -> Result<(), AppError> {
        self.record.delete_year(year_id).await?;
        info!("Deleted academic year {}", year_id);
        Ok(())
    }

    /// Upsert one selection, copying in the program's and division's names
    /// as they are right now
    pub async fn toggle_selection(
        &self,
        year_id: i64,
        program_id: i64,
        selected: bool,
    ) -> Result<ScheduleEntry, AppError> {
        let divisions = self.record.list_divisions().await?;
        let (division_name, program_name) = divisions
            .iter()
            .find_map(|d| {
                d.program(program_id)
                    .map(|p| (d.division_name.clone(), p.program_name.clone()))
            })
            .ok_or_else(|| not_found_error(format!("Program {} not found", program_id)))?;

        let upsert = ScheduleUpsert {
            academic_year_id: year_id,
            program_id,
            is_selected: selected,
            program_name,
            division_name,
        };
        match self.record.upsert_schedule_entry(upsert).await {
            Ok(entry) => {
                debug!(
                    "Program {} in year {} selected={}",
                    program_id, year_id, entry.is_selected
                );
                Ok(entry)
            }
            Err(e) => {
                if e.is_transient() {
                    warn!("Schedule toggle for program {} failed: {}", program_id, e);
                }
                Err(e)
            }
        }
    }

    /// Add the year after the most recently created one
    pub async fn add_next_year(&self) -> Result<AcademicYear, AppError> {
        let years = self.record.list_years().await?;
        let label = years
            .last()
            .and_then(|y| next_label(&y.label))
            .unwrap_or_else(|| self.default_label.clone());
        self.create(&years, &label).await
    }

    /// Add a year with an explicit label
    pub async fn add_year(&self, label: &str) -> Result<AcademicYear, AppError> {
        let label = label.trim();
        if label.is_empty() {
            return Err(validation_error("Year label cannot be empty"));
        }
        let years = self.record.list_years().await?;
        self.create(&years, label).await
    }

    async fn create(&self, existing: &[AcademicYear], label: &str) -> Result<AcademicYear, AppError> {
        if existing.iter().any(|y| y.label.eq_ignore_ascii_case(label)) {
            return Err(conflict_error(format!("Academic year {} already exists", label)));
        }
        let year = self.record.create_year(label).await?;
        info!("Added academic year {}", year.label);
        Ok(year)
    }

    /// Remove the most recently created year that is not current
    pub async fn remove_latest_year(&self) -> Result<AcademicYear, AppError> {
        let years = self.record.list_years().await?;
        let target = years
            .into_iter()
            .rev()
            .find(|y| !y.is_current)
            .ok_or_else(|| conflict_error("There are no removable years; the current year cannot be deleted"))?;
        self.delete_year(target.id).await?;
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Division, Program};
    use crate::record::{MemoryRecord, SystemOfRecord};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use tokio_test::{assert_err, assert_ok};

    fn record() -> Arc<MemoryRecord> {
        Arc::new(MemoryRecord::with_divisions(vec![Division {
            id: Some(1),
            division_name: "Arts".to_string(),
            program_list: vec![Program {
                id: Some(10),
                program_name: "Music".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        }]))
    }

    fn manager(record: &Arc<MemoryRecord>) -> ScheduleManager {
        ScheduleManager::new(record.clone(), "2024-2025")
    }

    async fn current_ids(manager: &ScheduleManager) -> Vec<i64> {
        manager
            .list_years()
            .await
            .unwrap()
            .into_iter()
            .filter(|y| y.is_current)
            .map(|y| y.id)
            .collect()
    }

    #[tokio::test]
    async fn test_exactly_one_current_after_each_set() {
        let record = record();
        let manager = manager(&record);
        let mut ids = Vec::new();
        for _ in 0..4 {
            ids.push(manager.add_next_year().await.unwrap().id);
        }

        for id in [ids[2], ids[0], ids[0], ids[3], ids[1]] {
            manager.set_current_year(id).await.unwrap();
            assert_eq!(current_ids(&manager).await, vec![id]);
        }
        assert_err!(manager.set_current_year(999).await);
        assert_eq!(current_ids(&manager).await, vec![ids[1]]);
    }

    #[tokio::test]
    async fn test_deleting_current_year_conflicts_and_changes_nothing() {
        let record = record();
        let manager = manager(&record);
        let year = manager.add_next_year().await.unwrap();
        manager.set_current_year(year.id).await.unwrap();
        manager.toggle_selection(year.id, 10, true).await.unwrap();

        let years_before = manager.list_years().await.unwrap();
        let schedule_before = manager.list_schedule(None).await.unwrap();

        let err = manager.delete_year(year.id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(manager.list_years().await.unwrap(), years_before);
        assert_eq!(manager.list_schedule(None).await.unwrap(), schedule_before);
    }

    #[tokio::test]
    async fn test_delete_cascades_selections() {
        let record = record();
        let manager = manager(&record);
        let old = manager.add_next_year().await.unwrap();
        let new = manager.add_next_year().await.unwrap();
        manager.set_current_year(new.id).await.unwrap();
        manager.toggle_selection(old.id, 10, true).await.unwrap();
        manager.toggle_selection(new.id, 10, true).await.unwrap();

        assert_ok!(manager.delete_year(old.id).await);
        let left = manager.list_schedule(None).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].academic_year_id, new.id);
    }

    #[tokio::test]
    async fn test_toggle_twice_is_one_entry() {
        let record = record();
        let manager = manager(&record);
        let year = manager.add_next_year().await.unwrap();

        let first = manager.toggle_selection(year.id, 10, true).await.unwrap();
        let second = manager.toggle_selection(year.id, 10, true).await.unwrap();

        let entries = manager.list_schedule(Some(year.id)).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(
            (first.is_selected, &first.program_name, &first.division_name),
            (second.is_selected, &second.program_name, &second.division_name)
        );
    }

    #[tokio::test]
    async fn test_names_frozen_until_next_toggle() {
        let record = record();
        let manager = manager(&record);
        let year = manager.add_next_year().await.unwrap();
        manager.toggle_selection(year.id, 10, true).await.unwrap();

        let mut renamed = record.get_division(1).await.unwrap();
        renamed.division_name = "Fine Arts".to_string();
        renamed.program_list[0].program_name = "Music Theory".to_string();
        record.replace_division(renamed).await.unwrap();

        let stored = manager.list_schedule(Some(year.id)).await.unwrap();
        assert_eq!(stored[0].program_name, "Music");

        let refreshed = manager.toggle_selection(year.id, 10, false).await.unwrap();
        assert_eq!(refreshed.program_name, "Music Theory");
        assert_eq!(refreshed.division_name, "Fine Arts");
        assert!(!refreshed.is_selected);
    }

    #[tokio::test]
    async fn test_toggle_accepts_any_year_and_unknown_program_is_not_found() {
        let record = record();
        let manager = manager(&record);
        let old = manager.add_next_year().await.unwrap();
        let new = manager.add_next_year().await.unwrap();
        manager.set_current_year(new.id).await.unwrap();

        assert_ok!(manager.toggle_selection(old.id, 10, true).await);
        let err = manager.toggle_selection(old.id, 77, true).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_toggle_failure_is_transient() {
        let record = record();
        let manager = manager(&record);
        let year = manager.add_next_year().await.unwrap();
        record.set_offline(true);
        let err = manager.toggle_selection(year.id, 10, true).await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_add_next_year_labels() {
        let record = record();
        let manager = manager(&record);

        let first = manager.add_next_year().await.unwrap();
        assert_eq!(first.label, "2024-2025");
        manager.set_current_year(first.id).await.unwrap();
        assert_eq!(manager.add_next_year().await.unwrap().label, "2025-2026");

        manager.add_year("Special").await.unwrap();
        // unparsable latest label falls back to the default, which exists
        let err = manager.add_next_year().await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_add_year_rejects_duplicates_and_blank() {
        let record = record();
        let manager = manager(&record);
        manager.add_year("2030-2031").await.unwrap();

        assert!(matches!(manager.add_year(" 2030-2031 ").await, Err(AppError::Conflict(_))));
        assert!(matches!(manager.add_year("   ").await, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_remove_latest_skips_current() {
        let record = record();
        let manager = manager(&record);
        let a = manager.add_next_year().await.unwrap();
        let b = manager.add_next_year().await.unwrap();
        manager.set_current_year(b.id).await.unwrap();

        assert_eq!(manager.remove_latest_year().await.unwrap().id, a.id);
        let err = manager.remove_latest_year().await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(current_ids(&manager).await, vec![b.id]);
    }
}
