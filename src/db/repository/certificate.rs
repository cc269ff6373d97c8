use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::Certificate;

use super::{fmt_datetime, parse_date, parse_datetime, parse_uuid};

pub fn insert_certificate(conn: &Connection, cert: &Certificate) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO certificates (id, patient_id, start_date, end_date, content, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            cert.id.to_string(),
            cert.patient_id.to_string(),
            cert.start_date.to_string(),
            cert.end_date.to_string(),
            cert.content,
            fmt_datetime(&cert.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_certificate(conn: &Connection, id: &Uuid) -> Result<Certificate, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, patient_id, start_date, end_date, content, created_at
             FROM certificates WHERE id = ?1",
            params![id.to_string()],
            certificate_row,
        )
        .optional()?;

    match row {
        Some(row) => certificate_from_row(row),
        None => Err(DatabaseError::NotFound {
            entity_type: "certificate".into(),
            id: id.to_string(),
        }),
    }
}

/// Certificates of a patient, newest first.
pub fn list_certificates_for_patient(
    conn: &Connection,
    patient_id: &Uuid,
) -> Result<Vec<Certificate>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_id, start_date, end_date, content, created_at
         FROM certificates WHERE patient_id = ?1
         ORDER BY created_at DESC, start_date DESC",
    )?;

    let rows = stmt.query_map(params![patient_id.to_string()], certificate_row)?;

    let mut certs = Vec::new();
    for row in rows {
        certs.push(certificate_from_row(row?)?);
    }
    Ok(certs)
}

pub fn delete_certificate(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "DELETE FROM certificates WHERE id = ?1",
        params![id.to_string()],
    )?;

    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "certificate".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

type CertificateRow = (String, String, String, String, String, String);

fn certificate_row(row: &rusqlite::Row<'_>) -> Result<CertificateRow, rusqlite::Error> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn certificate_from_row(row: CertificateRow) -> Result<Certificate, DatabaseError> {
    let (id, patient_id, start_date, end_date, content, created_at) = row;
    Ok(Certificate {
        id: parse_uuid(&id)?,
        patient_id: parse_uuid(&patient_id)?,
        start_date: parse_date(&start_date)?,
        end_date: parse_date(&end_date)?,
        content,
        created_at: parse_datetime(&created_at)?,
    })
}
