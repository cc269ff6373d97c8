use std::path::Path;

use rusqlite::Connection;
use tracing;

use super::DatabaseError;

/// Open a SQLite connection to the given path and run migrations
pub fn open_database(path: &Path) -> Result<Connection, DatabaseError> {
    let conn = Connection::open(path)?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing)
pub fn open_memory_database() -> Result<Connection, DatabaseError> {
    let conn = Connection::open_in_memory()?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

fn configure_pragmas(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "PRAGMA journal_mode=DELETE;
         PRAGMA foreign_keys=ON;",
    )?;
    Ok(())
}

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    let current_version = get_current_version(conn);

    let migrations: Vec<(i64, &str)> = vec![
        (1, include_str!("../../resources/migrations/001_initial.sql")),
        (
            2,
            include_str!("../../resources/migrations/002_patient_menstrual_date.sql"),
        ),
        (
            3,
            include_str!("../../resources/migrations/003_consultation_window.sql"),
        ),
    ];

    for (version, sql) in migrations {
        if version > current_version {
            tracing::info!("Running migration v{version}");
            conn.execute_batch(sql).map_err(|e| DatabaseError::MigrationFailed {
                version,
                reason: e.to_string(),
            })?;
        }
    }

    Ok(())
}

/// Get the current schema version (0 if no schema exists yet)
fn get_current_version(conn: &Connection) -> i64 {
    conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
        row.get::<_, i64>(0)
    })
    .unwrap_or(0)
}

/// Count tables in the database (for verification)
pub fn count_tables(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_initializes_all_tables() {
        let conn = open_memory_database().unwrap();
        // 11 entity tables + schema_version = 12
        let count = count_tables(&conn).unwrap();
        assert_eq!(count, 12, "Expected 12 tables, got {count}");
    }

    #[test]
    fn schema_version_is_current() {
        let conn = open_memory_database().unwrap();
        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, 3);
    }

    #[test]
    fn migration_idempotent() {
        let conn = open_memory_database().unwrap();
        // Run migrations again — should not error
        let result = run_migrations(&conn);
        assert!(result.is_ok());
    }

    #[test]
    fn foreign_keys_enabled() {
        let conn = open_memory_database().unwrap();
        let fk: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }

    #[test]
    fn database_opens_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("praxia.db");
        let conn = open_database(&path).unwrap();
        assert_eq!(count_tables(&conn).unwrap(), 12);

        // Re-open — should be idempotent
        let conn2 = open_database(&path).unwrap();
        assert_eq!(count_tables(&conn2).unwrap(), 12);
    }

    #[test]
    fn menstrual_date_lives_on_patients_after_migration() {
        let conn = open_memory_database().unwrap();

        let has_column = |table: &str, column: &str| -> bool {
            let mut stmt = conn
                .prepare(&format!("SELECT name FROM pragma_table_info('{table}')"))
                .unwrap();
            let names: Vec<String> = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .unwrap()
                .filter_map(|r| r.ok())
                .collect();
            names.iter().any(|n| n == column)
        };

        assert!(has_column("patients", "last_menstrual_date"));
        assert!(!has_column("case_descriptions", "last_menstrual_date"));
    }

    #[test]
    fn appointment_status_check_constraint() {
        let conn = open_memory_database().unwrap();
        conn.execute(
            "INSERT INTO patients (id, first_name, last_name) VALUES ('p1', 'A', 'B')",
            [],
        )
        .unwrap();

        let ok = conn.execute(
            "INSERT INTO appointments (id, patient_id, scheduled_at, status)
             VALUES ('a1', 'p1', '2026-03-02 09:00:00', 'waiting')",
            [],
        );
        assert!(ok.is_ok());

        let bad = conn.execute(
            "INSERT INTO appointments (id, patient_id, scheduled_at, status)
             VALUES ('a2', 'p1', '2026-03-02 09:30:00', 'pending')",
            [],
        );
        assert!(bad.is_err());
    }

    #[test]
    fn cascade_delete_removes_case_description() {
        let conn = open_memory_database().unwrap();
        conn.execute(
            "INSERT INTO patients (id, first_name, last_name) VALUES ('p1', 'A', 'B')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO appointments (id, patient_id, scheduled_at)
             VALUES ('a1', 'p1', '2026-03-02 09:00:00')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO case_descriptions (id, appointment_id, case_notes)
             VALUES ('c1', 'a1', 'notes')",
            [],
        )
        .unwrap();

        conn.execute("DELETE FROM appointments WHERE id = 'a1'", []).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM case_descriptions", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);

        // Patient is untouched
        let patients: i64 = conn
            .query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))
            .unwrap();
        assert_eq!(patients, 1);
    }

    #[test]
    fn patient_delete_is_restricted_while_appointments_exist() {
        let conn = open_memory_database().unwrap();
        conn.execute(
            "INSERT INTO patients (id, first_name, last_name) VALUES ('p1', 'A', 'B')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO appointments (id, patient_id, scheduled_at)
             VALUES ('a1', 'p1', '2026-03-02 09:00:00')",
            [],
        )
        .unwrap();

        let result = conn.execute("DELETE FROM patients WHERE id = 'p1'", []);
        assert!(result.is_err());
    }
}
