//! SQL query constants
//!
//! Contains all SQL used by the Postgres system of record.

/// Schema bootstrap, run once at startup
pub const CREATE_SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS divisions (
        id BIGSERIAL PRIMARY KEY,
        division_name TEXT NOT NULL DEFAULT '',
        dean_name TEXT NOT NULL DEFAULT '',
        chair_name TEXT NOT NULL DEFAULT '',
        pen_contact TEXT NOT NULL DEFAULT '',
        loc_rep TEXT NOT NULL DEFAULT '',
        notes TEXT NOT NULL DEFAULT ''
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS programs (
        id BIGSERIAL PRIMARY KEY,
        division_id BIGINT NOT NULL REFERENCES divisions(id) ON DELETE CASCADE,
        position INTEGER NOT NULL DEFAULT 0,
        program_name TEXT NOT NULL DEFAULT '',
        notes TEXT NOT NULL DEFAULT '',
        has_been_paid BOOLEAN NOT NULL DEFAULT false,
        report_submitted BOOLEAN NOT NULL DEFAULT false
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS payees (
        id BIGSERIAL PRIMARY KEY,
        program_id BIGINT NOT NULL REFERENCES programs(id) ON DELETE CASCADE,
        position INTEGER NOT NULL DEFAULT 0,
        name TEXT NOT NULL DEFAULT '',
        amount DOUBLE PRECISION NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS academic_years (
        id BIGSERIAL PRIMARY KEY,
        label TEXT NOT NULL UNIQUE,
        is_current BOOLEAN NOT NULL DEFAULT false,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    // At most one row may carry is_current = true
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS academic_years_single_current
        ON academic_years (is_current) WHERE is_current
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS program_schedule (
        academic_year_id BIGINT NOT NULL REFERENCES academic_years(id) ON DELETE CASCADE,
        program_id BIGINT NOT NULL,
        is_selected BOOLEAN NOT NULL DEFAULT false,
        program_name TEXT NOT NULL DEFAULT '',
        division_name TEXT NOT NULL DEFAULT '',
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        PRIMARY KEY (academic_year_id, program_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS division_snapshots (
        id BIGSERIAL PRIMARY KEY,
        division_id BIGINT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        payload JSONB NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS division_snapshots_created_at
        ON division_snapshots (created_at DESC)
    "#,
];

pub const LIST_DIVISIONS: &str = r#"
    SELECT id, division_name, dean_name, chair_name, pen_contact, loc_rep, notes
    FROM divisions
    ORDER BY id
"#;

pub const GET_DIVISION: &str = r#"
    SELECT id, division_name, dean_name, chair_name, pen_contact, loc_rep, notes
    FROM divisions
    WHERE id = $1
"#;

/// Programs for a set of divisions, in display order
pub const LIST_PROGRAMS: &str = r#"
    SELECT id, division_id, program_name, notes, has_been_paid, report_submitted
    FROM programs
    WHERE division_id = ANY($1)
    ORDER BY division_id, position, id
"#;

pub const LIST_PAYEES: &str = r#"
    SELECT program_id, name, amount
    FROM payees
    WHERE program_id = ANY($1)
    ORDER BY program_id, position, id
"#;

pub const INSERT_SNAPSHOT: &str = r#"
    INSERT INTO division_snapshots (division_id, payload)
    VALUES ($1, $2)
    RETURNING id, division_id, created_at, payload
"#;

pub const LIST_SNAPSHOTS: &str = r#"
    SELECT id, division_id, created_at, payload
    FROM division_snapshots
    ORDER BY created_at DESC, id DESC
    LIMIT $1
"#;

pub const LIST_YEARS: &str = r#"
    SELECT id, label, is_current, created_at
    FROM academic_years
    ORDER BY id
"#;

pub const INSERT_YEAR: &str = r#"
    INSERT INTO academic_years (label)
    VALUES ($1)
    RETURNING id, label, is_current, created_at
"#;

pub const CLEAR_CURRENT_YEAR: &str = r#"
    UPDATE academic_years SET is_current = false WHERE is_current
"#;

pub const MARK_CURRENT_YEAR: &str = r#"
    UPDATE academic_years SET is_current = true
    WHERE id = $1
    RETURNING id, label, is_current, created_at
"#;

pub const LOCK_YEAR: &str = r#"
    SELECT is_current FROM academic_years WHERE id = $1 FOR UPDATE
"#;

pub const DELETE_YEAR_SCHEDULE: &str = r#"
    DELETE FROM program_schedule WHERE academic_year_id = $1
"#;

pub const DELETE_YEAR: &str = r#"
    DELETE FROM academic_years WHERE id = $1
"#;

pub const LIST_SCHEDULE: &str = r#"
    SELECT academic_year_id, program_id, is_selected, program_name, division_name, updated_at
    FROM program_schedule
    WHERE $1::BIGINT IS NULL OR academic_year_id = $1
    ORDER BY academic_year_id, program_id
"#;

pub const UPSERT_SCHEDULE: &str = r#"
    INSERT INTO program_schedule
        (academic_year_id, program_id, is_selected, program_name, division_name, updated_at)
    VALUES ($1, $2, $3, $4, $5, now())
    ON CONFLICT (academic_year_id, program_id) DO UPDATE SET
        is_selected = EXCLUDED.is_selected,
        program_name = EXCLUDED.program_name,
        division_name = EXCLUDED.division_name,
        updated_at = now()
    RETURNING academic_year_id, program_id, is_selected, program_name, division_name, updated_at
"#;
