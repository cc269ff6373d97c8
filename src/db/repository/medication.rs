use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{Medication, MedicationFilter};

use super::parse_uuid;

const MEDICATION_COLUMNS: &str = "id, name, price_cents, dosage, composition, class, code, archived";

pub fn insert_medication(conn: &Connection, med: &Medication) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO medications (id, name, price_cents, dosage, composition, class, code, archived)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            med.id.to_string(),
            med.name,
            med.price_cents,
            med.dosage,
            med.composition,
            med.class,
            med.code,
            med.archived as i32,
        ],
    )?;
    Ok(())
}

pub fn get_medication(conn: &Connection, id: &Uuid) -> Result<Medication, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {MEDICATION_COLUMNS} FROM medications WHERE id = ?1"),
            params![id.to_string()],
            medication_from_rusqlite,
        )
        .optional()?;

    match row {
        Some(med) => med,
        None => Err(DatabaseError::NotFound {
            entity_type: "medication".into(),
            id: id.to_string(),
        }),
    }
}

pub fn list_medications(
    conn: &Connection,
    filter: &MedicationFilter,
) -> Result<Vec<Medication>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MEDICATION_COLUMNS} FROM medications WHERE archived = ?1 ORDER BY name"
    ))?;

    let rows = stmt.query_map(params![filter.archived as i32], medication_from_rusqlite)?;
    rows.map(|r| r?).collect()
}

/// Case-insensitive substring search on name and code; archived entries are
/// excluded and an empty term matches nothing.
pub fn search_medications(conn: &Connection, term: &str) -> Result<Vec<Medication>, DatabaseError> {
    if term.trim().is_empty() {
        return Ok(Vec::new());
    }

    let pattern = format!("%{}%", term.trim());
    let mut stmt = conn.prepare(&format!(
        "SELECT {MEDICATION_COLUMNS} FROM medications
         WHERE archived = 0
           AND (LOWER(name) LIKE LOWER(?1) OR LOWER(COALESCE(code, '')) LIKE LOWER(?1))
         ORDER BY name"
    ))?;

    let rows = stmt.query_map(params![pattern], medication_from_rusqlite)?;
    rows.map(|r| r?).collect()
}

pub fn update_medication(conn: &Connection, med: &Medication) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE medications SET name = ?2, price_cents = ?3, dosage = ?4, composition = ?5,
         class = ?6, code = ?7
         WHERE id = ?1",
        params![
            med.id.to_string(),
            med.name,
            med.price_cents,
            med.dosage,
            med.composition,
            med.class,
            med.code,
        ],
    )?;

    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "medication".into(),
            id: med.id.to_string(),
        });
    }
    Ok(())
}

pub fn set_medication_archived(
    conn: &Connection,
    id: &Uuid,
    archived: bool,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE medications SET archived = ?2 WHERE id = ?1",
        params![id.to_string(), archived as i32],
    )?;

    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "medication".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

fn medication_from_rusqlite(
    row: &rusqlite::Row<'_>,
) -> Result<Result<Medication, DatabaseError>, rusqlite::Error> {
    let id: String = row.get(0)?;
    let archived: i32 = row.get(7)?;
    Ok(parse_uuid(&id).map(|id| Medication {
        id,
        name: row.get(1).unwrap_or_default(),
        price_cents: row.get(2).unwrap_or_default(),
        dosage: row.get(3).unwrap_or_default(),
        composition: row.get(4).unwrap_or_default(),
        class: row.get(5).unwrap_or_default(),
        code: row.get(6).unwrap_or_default(),
        archived: archived != 0,
    }))
}
