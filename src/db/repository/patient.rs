use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::Gender;
use crate::models::{Patient, PatientFilter};

use super::{fmt_datetime, parse_date, parse_datetime, parse_uuid};

const PATIENT_COLUMNS: &str = "id, first_name, last_name, birth_date, gender, cin, phone, email,
     insurer, allergies, chronic_conditions, last_menstrual_date, archived, created_at";

pub fn insert_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO patients (id, first_name, last_name, birth_date, gender, cin, phone, email,
         insurer, allergies, chronic_conditions, last_menstrual_date, archived, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            patient.id.to_string(),
            patient.first_name,
            patient.last_name,
            patient.birth_date.map(|d| d.to_string()),
            patient.gender.map(|g| g.as_str()),
            patient.cin,
            patient.phone,
            patient.email,
            patient.insurer,
            patient.allergies,
            patient.chronic_conditions,
            patient.last_menstrual_date.map(|d| d.to_string()),
            patient.archived as i32,
            fmt_datetime(&patient.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_patient(conn: &Connection, id: &Uuid) -> Result<Patient, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?1"),
            params![id.to_string()],
            patient_row_from_rusqlite,
        )
        .optional()?;

    match row {
        Some(row) => patient_from_row(row),
        None => Err(DatabaseError::NotFound {
            entity_type: "patient".into(),
            id: id.to_string(),
        }),
    }
}

pub fn list_patients(
    conn: &Connection,
    filter: &PatientFilter,
) -> Result<Vec<Patient>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PATIENT_COLUMNS} FROM patients WHERE archived = ?1
         ORDER BY last_name, first_name"
    ))?;

    let rows = stmt.query_map(params![filter.archived as i32], patient_row_from_rusqlite)?;

    let mut patients = Vec::new();
    for row in rows {
        patients.push(patient_from_row(row?)?);
    }
    Ok(patients)
}

/// Case-insensitive substring search on name and CIN. Archived patients are
/// excluded; an empty term matches nothing.
pub fn search_patients(conn: &Connection, term: &str) -> Result<Vec<Patient>, DatabaseError> {
    if term.trim().is_empty() {
        return Ok(Vec::new());
    }

    let pattern = format!("%{}%", term.trim());
    let mut stmt = conn.prepare(&format!(
        "SELECT {PATIENT_COLUMNS} FROM patients
         WHERE archived = 0
           AND (LOWER(first_name) LIKE LOWER(?1)
                OR LOWER(last_name) LIKE LOWER(?1)
                OR LOWER(first_name || ' ' || last_name) LIKE LOWER(?1)
                OR LOWER(COALESCE(cin, '')) LIKE LOWER(?1))
         ORDER BY last_name, first_name",
    ))?;

    let rows = stmt.query_map(params![pattern], patient_row_from_rusqlite)?;

    let mut patients = Vec::new();
    for row in rows {
        patients.push(patient_from_row(row?)?);
    }
    Ok(patients)
}

pub fn update_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE patients SET first_name = ?2, last_name = ?3, birth_date = ?4, gender = ?5,
         cin = ?6, phone = ?7, email = ?8, insurer = ?9, allergies = ?10,
         chronic_conditions = ?11, last_menstrual_date = ?12
         WHERE id = ?1",
        params![
            patient.id.to_string(),
            patient.first_name,
            patient.last_name,
            patient.birth_date.map(|d| d.to_string()),
            patient.gender.map(|g| g.as_str()),
            patient.cin,
            patient.phone,
            patient.email,
            patient.insurer,
            patient.allergies,
            patient.chronic_conditions,
            patient.last_menstrual_date.map(|d| d.to_string()),
        ],
    )?;

    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "patient".into(),
            id: patient.id.to_string(),
        });
    }
    Ok(())
}

/// Flip only the archive flag; every other column is left untouched.
pub fn set_patient_archived(
    conn: &Connection,
    id: &Uuid,
    archived: bool,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE patients SET archived = ?2 WHERE id = ?1",
        params![id.to_string(), archived as i32],
    )?;

    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "patient".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

/// Find a non-archived patient holding the given CIN, excluding `exclude`
/// (the record being updated). Used to keep CIN unique within the active set.
pub fn find_active_patient_by_cin(
    conn: &Connection,
    cin: &str,
    exclude: Option<&Uuid>,
) -> Result<Option<Uuid>, DatabaseError> {
    let exclude_id = exclude.map(|id| id.to_string()).unwrap_or_default();
    let found: Option<String> = conn
        .query_row(
            "SELECT id FROM patients
             WHERE archived = 0 AND cin = ?1 AND id != ?2",
            params![cin, exclude_id],
            |row| row.get(0),
        )
        .optional()?;

    found.map(|id| parse_uuid(&id)).transpose()
}

// Internal row type for Patient mapping
struct PatientRow {
    id: String,
    first_name: String,
    last_name: String,
    birth_date: Option<String>,
    gender: Option<String>,
    cin: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    insurer: Option<String>,
    allergies: Option<String>,
    chronic_conditions: Option<String>,
    last_menstrual_date: Option<String>,
    archived: i32,
    created_at: String,
}

fn patient_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<PatientRow, rusqlite::Error> {
    Ok(PatientRow {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        birth_date: row.get(3)?,
        gender: row.get(4)?,
        cin: row.get(5)?,
        phone: row.get(6)?,
        email: row.get(7)?,
        insurer: row.get(8)?,
        allergies: row.get(9)?,
        chronic_conditions: row.get(10)?,
        last_menstrual_date: row.get(11)?,
        archived: row.get(12)?,
        created_at: row.get(13)?,
    })
}

fn patient_from_row(row: PatientRow) -> Result<Patient, DatabaseError> {
    Ok(Patient {
        id: parse_uuid(&row.id)?,
        first_name: row.first_name,
        last_name: row.last_name,
        birth_date: row.birth_date.as_deref().map(parse_date).transpose()?,
        gender: row.gender.as_deref().map(Gender::from_str).transpose()?,
        cin: row.cin,
        phone: row.phone,
        email: row.email,
        insurer: row.insurer,
        allergies: row.allergies,
        chronic_conditions: row.chronic_conditions,
        last_menstrual_date: row
            .last_menstrual_date
            .as_deref()
            .map(parse_date)
            .transpose()?,
        archived: row.archived != 0,
        created_at: parse_datetime(&row.created_at)?,
    })
}
