//! Database schema definitions
//!
//! Contains SQL for creating all tables, indexes and triggers

use rusqlite::Connection;
use super::DbError;

/// SQL schema for all tables
const SCHEMA: &str = r#"
-- Equipment catalog, keyed by barcode
CREATE TABLE IF NOT EXISTS equipment (
    sku TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    category TEXT,
    kit_role TEXT NOT NULL DEFAULT 'none'
        CHECK (kit_role IN ('none', 'kit_main', 'kit_part'))
);

CREATE INDEX IF NOT EXISTS idx_equipment_name ON equipment(name);

-- Ordered part list of each kit main
CREATE TABLE IF NOT EXISTS kit_parts (
    kit_sku TEXT NOT NULL REFERENCES equipment(sku) ON DELETE CASCADE,
    part_sku TEXT NOT NULL,
    position INTEGER NOT NULL,
    PRIMARY KEY (kit_sku, part_sku),
    CHECK (kit_sku <> part_sku)
);

-- Student roster
CREATE TABLE IF NOT EXISTS students (
    student_id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL
);

-- Availability ledger, one row per equipment name
CREATE TABLE IF NOT EXISTS availability (
    name TEXT PRIMARY KEY NOT NULL,
    location TEXT NOT NULL CHECK (location IN ('in', 'out'))
);

-- Append-only movement history
CREATE TABLE IF NOT EXISTS audit_log (
    entry_id INTEGER PRIMARY KEY AUTOINCREMENT,
    sku TEXT NOT NULL,
    equipment_name TEXT NOT NULL,
    student_id TEXT NOT NULL,
    student_name TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    direction TEXT NOT NULL CHECK (direction IN ('check_in', 'check_out'))
);

CREATE INDEX IF NOT EXISTS idx_audit_log_time ON audit_log(timestamp DESC);
CREATE INDEX IF NOT EXISTS idx_audit_log_student ON audit_log(student_id);

CREATE TRIGGER IF NOT EXISTS audit_log_no_update
BEFORE UPDATE ON audit_log
BEGIN
    SELECT RAISE(ABORT, 'audit_log is append-only');
END;

CREATE TRIGGER IF NOT EXISTS audit_log_no_delete
BEFORE DELETE ON audit_log
BEGIN
    SELECT RAISE(ABORT, 'audit_log is append-only');
END;
"#;

/// Create all database tables
pub fn create_tables(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}
