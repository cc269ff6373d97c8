use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::DocumentKind;
use crate::models::PatientDocument;

use super::{fmt_datetime, parse_datetime, parse_uuid};

pub fn insert_document(conn: &Connection, doc: &PatientDocument) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO patient_documents (id, patient_id, name, kind, file_path, size_bytes, uploaded_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            doc.id.to_string(),
            doc.patient_id.to_string(),
            doc.name,
            doc.kind.as_str(),
            doc.file_path,
            doc.size_bytes,
            fmt_datetime(&doc.uploaded_at),
        ],
    )?;
    Ok(())
}

pub fn get_document(conn: &Connection, id: &Uuid) -> Result<PatientDocument, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, patient_id, name, kind, file_path, size_bytes, uploaded_at
             FROM patient_documents WHERE id = ?1",
            params![id.to_string()],
            document_row,
        )
        .optional()?;

    match row {
        Some(row) => document_from_row(row),
        None => Err(DatabaseError::NotFound {
            entity_type: "document".into(),
            id: id.to_string(),
        }),
    }
}

/// Documents of a patient, newest upload first.
pub fn list_documents_for_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<PatientDocument>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, name, kind, file_path, size_bytes, uploaded_at
         FROM patient_documents WHERE patient_id = ?1
         ORDER BY uploaded_at DESC",
    )?;

    let rows = stmt.query_map(params![patient_id.to_string()], document_row)?;

    let mut docs = Vec::new();
    for row in rows {
        docs.push(document_from_row(row?)?);
    }
    Ok(docs)
}

pub fn delete_document(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "DELETE FROM patient_documents WHERE id = ?1",
        params![id.to_string()],
    )?;

    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "document".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

type DocumentRow = (String, String, String, String, String, i64, String);

fn document_row(row: &rusqlite::Row<'_>) -> Result<DocumentRow, rusqlite::Error> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn document_from_row(row: DocumentRow) -> Result<PatientDocument, DatabaseError> {
    let (id, patient_id, name, kind, file_path, size_bytes, uploaded_at) = row;
    Ok(PatientDocument {
        id: parse_uuid(&id)?,
        patient_id: parse_uuid(&patient_id)?,
        name,
        kind: DocumentKind::from_str(&kind)?,
        file_path,
        size_bytes,
        uploaded_at: parse_datetime(&uploaded_at)?,
    })
}
