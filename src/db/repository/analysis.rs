use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{Analysis, AnalysisFilter};

use super::parse_uuid;

pub fn insert_analysis(conn: &Connection, analysis: &Analysis) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO analyses (id, kind, department, archived) VALUES (?1, ?2, ?3, ?4)",
        params![
            analysis.id.to_string(),
            analysis.kind,
            analysis.department,
            analysis.archived as i32,
        ],
    )?;
    Ok(())
}

pub fn get_analysis(conn: &Connection, id: &Uuid) -> Result<Analysis, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, kind, department, archived FROM analyses WHERE id = ?1",
            params![id.to_string()],
            analysis_from_rusqlite,
        )
        .optional()?;

    match row {
        Some(analysis) => analysis,
        None => Err(DatabaseError::NotFound {
            entity_type: "analysis".into(),
            id: id.to_string(),
        }),
    }
}

pub fn list_analyses(
    conn: &Connection,
    filter: &AnalysisFilter,
) -> Result<Vec<Analysis>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, kind, department, archived FROM analyses WHERE archived = ?1 ORDER BY kind",
    )?;

    let rows = stmt.query_map(params![filter.archived as i32], analysis_from_rusqlite)?;
    rows.map(|r| r?).collect()
}

/// Case-insensitive substring search on kind and department.
pub fn search_analyses(conn: &Connection, term: &str) -> Result<Vec<Analysis>, DatabaseError> {
    if term.trim().is_empty() {
        return Ok(Vec::new());
    }

    let pattern = format!("%{}%", term.trim());
    let mut stmt = conn.prepare(
        "SELECT id, kind, department, archived FROM analyses
         WHERE archived = 0
           AND (LOWER(kind) LIKE LOWER(?1) OR LOWER(COALESCE(department, '')) LIKE LOWER(?1))
         ORDER BY kind",
    )?;

    let rows = stmt.query_map(params![pattern], analysis_from_rusqlite)?;
    rows.map(|r| r?).collect()
}

pub fn update_analysis(conn: &Connection, analysis: &Analysis) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE analyses SET kind = ?2, department = ?3 WHERE id = ?1",
        params![analysis.id.to_string(), analysis.kind, analysis.department],
    )?;

    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "analysis".into(),
            id: analysis.id.to_string(),
        });
    }
    Ok(())
}

pub fn set_analysis_archived(
    conn: &Connection,
    id: &Uuid,
    archived: bool,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE analyses SET archived = ?2 WHERE id = ?1",
        params![id.to_string(), archived as i32],
    )?;

    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "analysis".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

/// Hard delete — the only registry that supports it. Pivot rows referencing
/// the analysis are removed by the cascade.
pub fn delete_analysis(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "DELETE FROM analyses WHERE id = ?1",
        params![id.to_string()],
    )?;

    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "analysis".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

fn analysis_from_rusqlite(
    row: &rusqlite::Row<'_>,
) -> Result<Result<Analysis, DatabaseError>, rusqlite::Error> {
    let id: String = row.get(0)?;
    let archived: i32 = row.get(3)?;
    Ok(parse_uuid(&id).map(|id| Analysis {
        id,
        kind: row.get(1).unwrap_or_default(),
        department: row.get(2).unwrap_or_default(),
        archived: archived != 0,
    }))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    pub(crate) fn sample_analysis(kind: &str) -> Analysis {
        Analysis {
            id: Uuid::new_v4(),
            kind: kind.to_string(),
            department: Some("hematology".to_string()),
            archived: false,
        }
    }

    #[test]
    fn insert_and_get_round_trip() {
        let conn = open_memory_database().unwrap();
        let analysis = sample_analysis("NFS");
        insert_analysis(&conn, &analysis).unwrap();

        let loaded = get_analysis(&conn, &analysis.id).unwrap();
        assert_eq!(loaded.kind, "NFS");
        assert_eq!(loaded.department.as_deref(), Some("hematology"));
    }

    #[test]
    fn search_matches_kind_and_department() {
        let conn = open_memory_database().unwrap();
        insert_analysis(&conn, &sample_analysis("NFS")).unwrap();
        insert_analysis(&conn, &sample_analysis("Glycemie")).unwrap();

        let hits = search_analyses(&conn, "glyc").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].kind, "Glycemie");

        let hits = search_analyses(&conn, "hemato").unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn search_no_match_returns_empty_list() {
        let conn = open_memory_database().unwrap();
        insert_analysis(&conn, &sample_analysis("NFS")).unwrap();
        assert!(search_analyses(&conn, "none").unwrap().is_empty());
    }

    #[test]
    fn archive_restore_round_trip() {
        let conn = open_memory_database().unwrap();
        let analysis = sample_analysis("NFS");
        insert_analysis(&conn, &analysis).unwrap();

        set_analysis_archived(&conn, &analysis.id, true).unwrap();
        assert!(list_analyses(&conn, &AnalysisFilter::default()).unwrap().is_empty());

        set_analysis_archived(&conn, &analysis.id, false).unwrap();
        let restored = get_analysis(&conn, &analysis.id).unwrap();
        assert!(!restored.archived);
        assert_eq!(restored.kind, analysis.kind);
    }

    #[test]
    fn delete_removes_the_row() {
        let conn = open_memory_database().unwrap();
        let analysis = sample_analysis("NFS");
        insert_analysis(&conn, &analysis).unwrap();

        delete_analysis(&conn, &analysis.id).unwrap();
        assert!(matches!(
            get_analysis(&conn, &analysis.id),
            Err(DatabaseError::NotFound { .. })
        ));
    }

    #[test]
    fn delete_unknown_analysis_is_not_found() {
        let conn = open_memory_database().unwrap();
        let result = delete_analysis(&conn, &Uuid::new_v4());
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }
}
