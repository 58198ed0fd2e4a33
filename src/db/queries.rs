//! Database query implementations
//!
//! Contains functions for the catalog, student roster, availability ledger
//! and audit log. Multi-statement writes expect to be called inside
//! [`super::Database::with_transaction`].

use std::collections::BTreeSet;

use rusqlite::{params, Connection, OptionalExtension};
use super::DbError;
use crate::models::audit::{format_timestamp, parse_timestamp};
use crate::models::{AuditLogEntry, AvailabilityRecord, Direction, EquipmentItem, KitRole, Location, Student};

/// Audit row as stored, before enum/timestamp conversion
struct RawAuditRow {
    sku: String,
    equipment_name: String,
    student_id: String,
    student_name: String,
    timestamp: String,
    direction: String,
}

impl RawAuditRow {
    fn into_entry(self) -> Result<AuditLogEntry, DbError> {
        let timestamp = parse_timestamp(&self.timestamp)
            .ok_or_else(|| DbError::InvalidValue(format!("timestamp '{}'", self.timestamp)))?;
        let direction = Direction::from_str(&self.direction)
            .ok_or_else(|| DbError::InvalidValue(format!("direction '{}'", self.direction)))?;

        Ok(AuditLogEntry {
            sku: self.sku,
            equipment_name: self.equipment_name,
            student_id: self.student_id,
            student_name: self.student_name,
            timestamp,
            direction,
        })
    }
}

fn parse_location(value: &str) -> Result<Location, DbError> {
    Location::from_str(value).ok_or_else(|| DbError::InvalidValue(format!("location '{}'", value)))
}

// ============================================================================
// Catalog
// ============================================================================

/// Get a single equipment item by SKU, including its kit parts
pub fn lookup_equipment(conn: &Connection, sku: &str) -> Result<Option<EquipmentItem>, DbError> {
    let row = conn
        .query_row(
            "SELECT sku, name, category, kit_role FROM equipment WHERE sku = ?1",
            params![sku],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        )
        .optional()?;

    let Some((sku, name, category, kit_role)) = row else {
        return Ok(None);
    };

    let kit_role = KitRole::from_str(&kit_role)
        .ok_or_else(|| DbError::InvalidValue(format!("kit role '{}'", kit_role)))?;

    let kit_parts = if kit_role == KitRole::KitMain {
        load_kit_parts(conn, &sku)?
    } else {
        Vec::new()
    };

    Ok(Some(EquipmentItem {
        sku,
        name,
        category,
        kit_role,
        kit_parts,
    }))
}

/// Get the ordered part list of a kit.
///
/// Returns `None` when the SKU is not catalogued at all.
pub fn lookup_kit_parts(conn: &Connection, sku: &str) -> Result<Option<Vec<String>>, DbError> {
    let exists: Option<i32> = conn
        .query_row("SELECT 1 FROM equipment WHERE sku = ?1", params![sku], |row| row.get(0))
        .optional()?;

    if exists.is_none() {
        return Ok(None);
    }

    Ok(Some(load_kit_parts(conn, sku)?))
}

fn load_kit_parts(conn: &Connection, kit_sku: &str) -> Result<Vec<String>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT part_sku FROM kit_parts WHERE kit_sku = ?1 ORDER BY position ASC",
    )?;

    let parts = stmt
        .query_map(params![kit_sku], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;

    Ok(parts)
}

/// Replace the whole catalog.
///
/// Deletes every equipment, kit part and availability row, inserts `items`,
/// and gives each distinct name one availability record set to `in`.
/// The audit log is not touched.
pub fn replace_catalog(conn: &Connection, items: &[EquipmentItem]) -> Result<usize, DbError> {
    conn.execute("DELETE FROM kit_parts", [])?;
    conn.execute("DELETE FROM equipment", [])?;
    conn.execute("DELETE FROM availability", [])?;

    let mut insert_item = conn.prepare(
        "INSERT INTO equipment (sku, name, category, kit_role) VALUES (?1, ?2, ?3, ?4)",
    )?;
    let mut insert_part = conn.prepare(
        "INSERT INTO kit_parts (kit_sku, part_sku, position) VALUES (?1, ?2, ?3)",
    )?;

    let mut names = BTreeSet::new();

    for item in items {
        insert_item.execute(params![
            item.sku,
            item.name,
            item.category,
            item.kit_role.as_str()
        ])?;

        for (position, part) in item.kit_parts.iter().enumerate() {
            insert_part.execute(params![item.sku, part, position as i64])?;
        }

        names.insert(item.name.as_str());
    }

    for name in &names {
        set_location(conn, name, Location::In)?;
    }

    Ok(items.len())
}

// ============================================================================
// Students
// ============================================================================

/// Get a single student by ID
pub fn lookup_student(conn: &Connection, student_id: &str) -> Result<Option<Student>, DbError> {
    let student = conn
        .query_row(
            "SELECT student_id, name FROM students WHERE student_id = ?1",
            params![student_id],
            |row| {
                Ok(Student {
                    student_id: row.get(0)?,
                    name: row.get(1)?,
                })
            },
        )
        .optional()?;

    Ok(student)
}

/// Get all students ordered by name
pub fn list_students(conn: &Connection) -> Result<Vec<Student>, DbError> {
    let mut stmt = conn.prepare("SELECT student_id, name FROM students ORDER BY name ASC")?;

    let students = stmt
        .query_map([], |row| {
            Ok(Student {
                student_id: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(students)
}

/// Insert students, optionally clearing the roster first.
///
/// IDs that already exist are skipped. Returns the number inserted.
pub fn import_students(
    conn: &Connection,
    students: &[Student],
    replace_existing: bool,
) -> Result<usize, DbError> {
    if replace_existing {
        conn.execute("DELETE FROM students", [])?;
    }

    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO students (student_id, name) VALUES (?1, ?2)",
    )?;

    let mut inserted = 0;
    for student in students {
        inserted += stmt.execute(params![student.student_id, student.name])?;
    }

    Ok(inserted)
}

// ============================================================================
// Availability ledger
// ============================================================================

/// Get the current location of an equipment name
pub fn get_location(conn: &Connection, name: &str) -> Result<Option<Location>, DbError> {
    let location: Option<String> = conn
        .query_row(
            "SELECT location FROM availability WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )
        .optional()?;

    location.as_deref().map(parse_location).transpose()
}

/// Set the location of an equipment name, creating the record if missing
pub fn set_location(conn: &Connection, name: &str, location: Location) -> Result<(), DbError> {
    conn.execute(
        r#"
        INSERT INTO availability (name, location) VALUES (?1, ?2)
        ON CONFLICT(name) DO UPDATE SET location = excluded.location
        "#,
        params![name, location.as_str()],
    )?;
    Ok(())
}

/// Get every availability record ordered by name
pub fn get_availability(conn: &Connection) -> Result<Vec<AvailabilityRecord>, DbError> {
    let mut stmt = conn.prepare("SELECT name, location FROM availability ORDER BY name ASC")?;

    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(name, location)| {
            Ok(AvailabilityRecord {
                name,
                location: parse_location(&location)?,
            })
        })
        .collect()
}

// ============================================================================
// Audit log
// ============================================================================

/// Append one audit entry
pub fn append_audit_entry(conn: &Connection, entry: &AuditLogEntry) -> Result<(), DbError> {
    conn.execute(
        r#"
        INSERT INTO audit_log (sku, equipment_name, student_id, student_name, timestamp, direction)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
        params![
            entry.sku,
            entry.equipment_name,
            entry.student_id,
            entry.student_name,
            format_timestamp(&entry.timestamp),
            entry.direction.as_str(),
        ],
    )?;
    Ok(())
}

/// Get audit entries, newest first
pub fn get_audit_log(
    conn: &Connection,
    limit: Option<u32>,
    offset: Option<u32>,
) -> Result<Vec<AuditLogEntry>, DbError> {
    // SQLite treats a negative LIMIT as unbounded
    let limit = limit.map(i64::from).unwrap_or(-1);
    let offset = offset.unwrap_or(0);

    let mut stmt = conn.prepare(
        r#"
        SELECT sku, equipment_name, student_id, student_name, timestamp, direction
        FROM audit_log
        ORDER BY timestamp DESC, entry_id DESC
        LIMIT ?1 OFFSET ?2
        "#,
    )?;

    let rows = stmt
        .query_map(params![limit, offset], map_audit_row)?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter().map(RawAuditRow::into_entry).collect()
}

/// Get audit entries for one student, newest first
pub fn get_audit_log_for_student(
    conn: &Connection,
    student_id: &str,
) -> Result<Vec<AuditLogEntry>, DbError> {
    let mut stmt = conn.prepare(
        r#"
        SELECT sku, equipment_name, student_id, student_name, timestamp, direction
        FROM audit_log
        WHERE student_id = ?1
        ORDER BY timestamp DESC, entry_id DESC
        "#,
    )?;

    let rows = stmt
        .query_map(params![student_id], map_audit_row)?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter().map(RawAuditRow::into_entry).collect()
}

/// Count all audit entries
pub fn count_audit_entries(conn: &Connection) -> Result<u64, DbError> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM audit_log", [], |row| row.get(0))?;
    Ok(count as u64)
}

fn map_audit_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawAuditRow> {
    Ok(RawAuditRow {
        sku: row.get(0)?,
        equipment_name: row.get(1)?,
        student_id: row.get(2)?,
        student_name: row.get(3)?,
        timestamp: row.get(4)?,
        direction: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::create_tables;
    use chrono::{TimeZone, Utc};

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        conn
    }

    fn sample_catalog() -> Vec<EquipmentItem> {
        vec![
            EquipmentItem::new("A1", "Drill").category("Tools"),
            EquipmentItem::new("A2", "Drill").category("Tools"),
            EquipmentItem::new("K1", "ProjectorKit").kit_main(["P2", "P1"]),
            EquipmentItem::new("P1", "Projector").kit_part(),
            EquipmentItem::new("P2", "Charger").kit_part(),
        ]
    }

    fn entry(sku: &str, name: &str, hour: u32) -> AuditLogEntry {
        AuditLogEntry {
            sku: sku.to_string(),
            equipment_name: name.to_string(),
            student_id: "S1".to_string(),
            student_name: "Ada".to_string(),
            timestamp: Utc.with_ymd_and_hms(2026, 1, 9, hour, 0, 0).unwrap(),
            direction: Direction::CheckOut,
        }
    }

    #[test]
    fn test_replace_catalog_and_lookup() {
        let conn = setup();
        assert_eq!(replace_catalog(&conn, &sample_catalog()).unwrap(), 5);

        let drill = lookup_equipment(&conn, "A1").unwrap().unwrap();
        assert_eq!(drill.name, "Drill");
        assert_eq!(drill.kit_role, KitRole::None);

        let kit = lookup_equipment(&conn, "K1").unwrap().unwrap();
        assert_eq!(kit.kit_role, KitRole::KitMain);
        assert_eq!(kit.kit_parts, vec!["P2".to_string(), "P1".to_string()]);

        assert!(lookup_equipment(&conn, "ZZ").unwrap().is_none());
    }

    #[test]
    fn test_lookup_kit_parts() {
        let conn = setup();
        replace_catalog(&conn, &sample_catalog()).unwrap();

        assert_eq!(
            lookup_kit_parts(&conn, "K1").unwrap(),
            Some(vec!["P2".to_string(), "P1".to_string()])
        );
        assert_eq!(lookup_kit_parts(&conn, "A1").unwrap(), Some(Vec::new()));
        assert_eq!(lookup_kit_parts(&conn, "ZZ").unwrap(), None);
    }

    #[test]
    fn test_replace_catalog_creates_one_record_per_name() {
        let conn = setup();
        replace_catalog(&conn, &sample_catalog()).unwrap();

        let records = get_availability(&conn).unwrap();
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Charger", "Drill", "Projector", "ProjectorKit"]);
        assert!(records.iter().all(|r| r.location == Location::In));
    }

    #[test]
    fn test_replace_catalog_resets_availability_and_keeps_audit_log() {
        let conn = setup();
        replace_catalog(&conn, &sample_catalog()).unwrap();
        set_location(&conn, "Drill", Location::Out).unwrap();
        append_audit_entry(&conn, &entry("A1", "Drill", 8)).unwrap();

        replace_catalog(&conn, &[EquipmentItem::new("A1", "Drill")]).unwrap();

        assert_eq!(get_location(&conn, "Drill").unwrap(), Some(Location::In));
        assert_eq!(get_location(&conn, "ProjectorKit").unwrap(), None);
        assert!(lookup_equipment(&conn, "K1").unwrap().is_none());
        assert_eq!(count_audit_entries(&conn).unwrap(), 1);
    }

    #[test]
    fn test_set_location_upserts() {
        let conn = setup();
        assert_eq!(get_location(&conn, "Drill").unwrap(), None);

        set_location(&conn, "Drill", Location::Out).unwrap();
        assert_eq!(get_location(&conn, "Drill").unwrap(), Some(Location::Out));

        set_location(&conn, "Drill", Location::In).unwrap();
        assert_eq!(get_location(&conn, "Drill").unwrap(), Some(Location::In));
        assert_eq!(get_availability(&conn).unwrap().len(), 1);
    }

    #[test]
    fn test_import_students() {
        let conn = setup();
        let roster = vec![Student::new("S1", "Ada"), Student::new("S2", "Grace")];
        assert_eq!(import_students(&conn, &roster, false).unwrap(), 2);

        // Existing IDs are kept as they are
        let again = vec![Student::new("S1", "Someone Else"), Student::new("S3", "Linus")];
        assert_eq!(import_students(&conn, &again, false).unwrap(), 1);
        assert_eq!(lookup_student(&conn, "S1").unwrap().unwrap().name, "Ada");
        assert_eq!(list_students(&conn).unwrap().len(), 3);

        assert_eq!(import_students(&conn, &[Student::new("S9", "Barbara")], true).unwrap(), 1);
        assert!(lookup_student(&conn, "S1").unwrap().is_none());
        assert_eq!(list_students(&conn).unwrap().len(), 1);
    }

    #[test]
    fn test_audit_log_newest_first() {
        let conn = setup();
        append_audit_entry(&conn, &entry("A1", "Drill", 8)).unwrap();
        append_audit_entry(&conn, &entry("A2", "Drill", 10)).unwrap();
        append_audit_entry(&conn, &entry("K1", "ProjectorKit", 9)).unwrap();

        let log = get_audit_log(&conn, None, None).unwrap();
        let skus: Vec<&str> = log.iter().map(|e| e.sku.as_str()).collect();
        assert_eq!(skus, vec!["A2", "K1", "A1"]);

        let page = get_audit_log(&conn, Some(1), Some(1)).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].sku, "K1");
        assert_eq!(page[0].direction, Direction::CheckOut);
    }

    #[test]
    fn test_audit_log_ties_keep_insertion_order_reversed() {
        let conn = setup();
        append_audit_entry(&conn, &entry("K1", "ProjectorKit", 8)).unwrap();
        append_audit_entry(&conn, &entry("P1", "Projector", 8)).unwrap();

        let log = get_audit_log(&conn, None, None).unwrap();
        assert_eq!(log[0].sku, "P1");
        assert_eq!(log[1].sku, "K1");
    }

    #[test]
    fn test_audit_log_for_student() {
        let conn = setup();
        append_audit_entry(&conn, &entry("A1", "Drill", 8)).unwrap();
        let mut other = entry("A2", "Drill", 9);
        other.student_id = "S2".to_string();
        append_audit_entry(&conn, &other).unwrap();

        let log = get_audit_log_for_student(&conn, "S2").unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].sku, "A2");
    }
}
