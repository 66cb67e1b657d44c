// Postgres system of record
//
// Multi-statement operations run inside one transaction so a failure part
// way through rolls everything back.

use crate::db::queries;
use crate::error::AppError;
use crate::models::{AcademicYear, Division, Payee, Program, ScheduleEntry, ScheduleUpsert, Snapshot};
use crate::record::SystemOfRecord;
use async_trait::async_trait;
use deadpool_postgres::Pool;
use postgres_types::Json;
use std::collections::HashMap;
use tokio_postgres::error::SqlState;
use tokio_postgres::Row;
use tracing::{debug, info};

pub struct PgRecord {
    pool: Pool,
}

fn year_from_row(row: &Row) -> AcademicYear {
    AcademicYear {
        id: row.get(0),
        label: row.get(1),
        is_current: row.get(2),
        created_at: row.get(3),
    }
}

fn entry_from_row(row: &Row) -> ScheduleEntry {
    ScheduleEntry {
        academic_year_id: row.get(0),
        program_id: row.get(1),
        is_selected: row.get(2),
        program_name: row.get(3),
        division_name: row.get(4),
        updated_at: row.get(5),
    }
}

fn snapshot_from_row(row: &Row) -> Snapshot {
    let Json(division): Json<Division> = row.get(3);
    Snapshot {
        id: row.get(0),
        division_id: row.get(1),
        created_at: row.get(2),
        division,
    }
}

fn division_from_row(row: &Row) -> Division {
    Division {
        id: Some(row.get(0)),
        division_name: row.get(1),
        dean_name: row.get(2),
        chair_name: row.get(3),
        pen_contact: row.get(4),
        loc_rep: row.get(5),
        notes: row.get(6),
        program_list: Vec::new(),
    }
}

impl PgRecord {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create tables and indexes if they don't exist
    pub async fn bootstrap(&self) -> Result<(), AppError> {
        let client = self.pool.get().await?;
        for statement in queries::CREATE_SCHEMA {
            client.batch_execute(statement).await?;
        }
        info!("Database schema ready");
        Ok(())
    }

    /// Attach programs and payees to already loaded divisions
    async fn load_programs(&self, divisions: &mut [Division]) -> Result<(), AppError> {
        let client = self.pool.get().await?;
        let division_ids: Vec<i64> = divisions.iter().filter_map(|d| d.id).collect();
        if division_ids.is_empty() {
            return Ok(());
        }

        let program_rows = client.query(queries::LIST_PROGRAMS, &[&division_ids]).await?;
        let program_ids: Vec<i64> = program_rows.iter().map(|r| r.get(0)).collect();
        let payee_rows = client.query(queries::LIST_PAYEES, &[&program_ids]).await?;

        let mut payees: HashMap<i64, Vec<Payee>> = HashMap::new();
        for row in &payee_rows {
            payees
                .entry(row.get(0))
                .or_default()
                .push(Payee::new(row.get::<_, String>(1), row.get(2)));
        }

        let mut programs: HashMap<i64, Vec<Program>> = HashMap::new();
        for row in &program_rows {
            let id: i64 = row.get(0);
            programs.entry(row.get(1)).or_default().push(Program {
                id: Some(id),
                program_name: row.get(2),
                notes: row.get(3),
                has_been_paid: row.get(4),
                report_submitted: row.get(5),
                payees: payees.remove(&id).unwrap_or_default(),
            });
        }

        for division in divisions.iter_mut() {
            if let Some(id) = division.id {
                division.program_list = programs.remove(&id).unwrap_or_default();
            }
        }
        Ok(())
    }
}

#[async_trait]
impl SystemOfRecord for PgRecord {
    async fn list_divisions(&self) -> Result<Vec<Division>, AppError> {
        let rows = {
            let client = self.pool.get().await?;
            client.query(queries::LIST_DIVISIONS, &[]).await?
        };
        let mut divisions: Vec<Division> = rows.iter().map(division_from_row).collect();
        self.load_programs(&mut divisions).await?;
        debug!("Loaded {} divisions", divisions.len());
        Ok(divisions)
    }

    async fn get_division(&self, id: i64) -> Result<Division, AppError> {
        let row = {
            let client = self.pool.get().await?;
            client.query_opt(queries::GET_DIVISION, &[&id]).await?
        };
        let row = row.ok_or_else(|| AppError::NotFound(format!("Division {} not found", id)))?;
        let mut divisions = vec![division_from_row(&row)];
        self.load_programs(&mut divisions).await?;
        divisions
            .pop()
            .ok_or_else(|| AppError::Internal("division vanished while loading".to_string()))
    }

    async fn append_snapshot(&self, division: &Division) -> Result<Snapshot, AppError> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(queries::INSERT_SNAPSHOT, &[&division.id, &Json(division)])
            .await?;
        Ok(snapshot_from_row(&row))
    }

    async fn list_snapshots(&self, limit: usize) -> Result<Vec<Snapshot>, AppError> {
        let client = self.pool.get().await?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = client.query(queries::LIST_SNAPSHOTS, &[&limit]).await?;
        Ok(rows.iter().map(snapshot_from_row).collect())
    }

    async fn list_years(&self) -> Result<Vec<AcademicYear>, AppError> {
        let client = self.pool.get().await?;
        let rows = client.query(queries::LIST_YEARS, &[]).await?;
        Ok(rows.iter().map(year_from_row).collect())
    }

    async fn create_year(&self, label: &str) -> Result<AcademicYear, AppError> {
        let client = self.pool.get().await?;
        match client.query_one(queries::INSERT_YEAR, &[&label]).await {
            Ok(row) => Ok(year_from_row(&row)),
            Err(e) if e.code() == Some(&SqlState::UNIQUE_VIOLATION) => Err(AppError::Conflict(
                format!("Academic year {} already exists", label),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn set_current_year(&self, id: i64) -> Result<AcademicYear, AppError> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        tx.execute(queries::CLEAR_CURRENT_YEAR, &[]).await?;
        let row = tx.query_opt(queries::MARK_CURRENT_YEAR, &[&id]).await?;
        let Some(row) = row else {
            // dropping the transaction rolls the clear back
            return Err(AppError::NotFound(format!("Academic year {} not found", id)));
        };
        tx.commit().await?;
        Ok(year_from_row(&row))
    }

    async fn delete_year(&self, id: i64) -> Result<(), AppError> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        let row = tx
            .query_opt(queries::LOCK_YEAR, &[&id])
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Academic year {} not found", id)))?;
        let is_current: bool = row.get(0);
        if is_current {
            return Err(AppError::Conflict("Cannot delete the current academic year".to_string()));
        }

        let removed = tx.execute(queries::DELETE_YEAR_SCHEDULE, &[&id]).await?;
        tx.execute(queries::DELETE_YEAR, &[&id]).await?;
        tx.commit().await?;
        debug!("Deleted year {} with {} schedule rows", id, removed);
        Ok(())
    }

    async fn list_schedule(&self, year_id: Option<i64>) -> Result<Vec<ScheduleEntry>, AppError> {
        let client = self.pool.get().await?;
        let rows = client.query(queries::LIST_SCHEDULE, &[&year_id]).await?;
        Ok(rows.iter().map(entry_from_row).collect())
    }

    async fn upsert_schedule_entry(&self, entry: ScheduleUpsert) -> Result<ScheduleEntry, AppError> {
        let client = self.pool.get().await?;
        let result = client
            .query_one(
                queries::UPSERT_SCHEDULE,
                &[
                    &entry.academic_year_id,
                    &entry.program_id,
                    &entry.is_selected,
                    &entry.program_name,
                    &entry.division_name,
                ],
            )
            .await;
        match result {
            Ok(row) => Ok(entry_from_row(&row)),
            Err(e) if e.code() == Some(&SqlState::FOREIGN_KEY_VIOLATION) => Err(AppError::NotFound(
                format!("Academic year {} not found", entry.academic_year_id),
            )),
            Err(e) => Err(e.into()),
        }
    }
}
