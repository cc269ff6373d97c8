use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::AppointmentStatus;
use crate::models::{
    Appointment, AppointmentFilter, CaseDescription, Posology, PrescribedMedication,
    RequestedAnalysis,
};

use super::{fmt_datetime, parse_datetime, parse_uuid};

const APPOINTMENT_COLUMNS: &str = "id, patient_id, scheduled_at, reason, status, mutuelle,
     price_cents, diagnosis, consultation_started_at, consultation_ended_at, created_at";

pub fn insert_appointment(conn: &Connection, appt: &Appointment) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO appointments (id, patient_id, scheduled_at, reason, status, mutuelle,
         price_cents, diagnosis, consultation_started_at, consultation_ended_at, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            appt.id.to_string(),
            appt.patient_id.to_string(),
            fmt_datetime(&appt.scheduled_at),
            appt.reason,
            appt.status.as_str(),
            appt.mutuelle as i32,
            appt.price_cents,
            appt.diagnosis,
            appt.consultation_started_at.as_ref().map(fmt_datetime),
            appt.consultation_ended_at.as_ref().map(fmt_datetime),
            fmt_datetime(&appt.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_appointment(conn: &Connection, id: &Uuid) -> Result<Appointment, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1"),
            params![id.to_string()],
            appointment_row_from_rusqlite,
        )
        .optional()?;

    match row {
        Some(row) => appointment_from_row(row),
        None => Err(DatabaseError::NotFound {
            entity_type: "appointment".into(),
            id: id.to_string(),
        }),
    }
}

pub fn list_appointments(
    conn: &Connection,
    filter: &AppointmentFilter,
) -> Result<Vec<Appointment>, DatabaseError> {
    let mut sql = format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE 1=1"
    );
    let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(date) = filter.date {
        sql.push_str(&format!(" AND date(scheduled_at) = ?{}", args.len() + 1));
        args.push(Box::new(date.to_string()));
    }
    if let Some(status) = filter.status {
        sql.push_str(&format!(" AND status = ?{}", args.len() + 1));
        args.push(Box::new(status.as_str()));
    }
    if let Some(patient_id) = filter.patient_id {
        sql.push_str(&format!(" AND patient_id = ?{}", args.len() + 1));
        args.push(Box::new(patient_id.to_string()));
    }
    sql.push_str(" ORDER BY scheduled_at");

    let mut stmt = conn.prepare(&sql)?;
    let arg_refs: Vec<&dyn rusqlite::ToSql> = args.iter().map(|a| a.as_ref()).collect();
    let rows = stmt.query_map(arg_refs.as_slice(), appointment_row_from_rusqlite)?;

    let mut appointments = Vec::new();
    for row in rows {
        appointments.push(appointment_from_row(row?)?);
    }
    Ok(appointments)
}

/// Details edit: reschedule, reason, billing price and diagnosis. Status and
/// consultation stamps are owned by the workflow and never touched here.
pub fn update_appointment_details(
    conn: &Connection,
    id: &Uuid,
    scheduled_at: &NaiveDateTime,
    reason: Option<&str>,
    price_cents: Option<i64>,
    diagnosis: Option<&str>,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE appointments SET scheduled_at = ?2, reason = ?3, price_cents = ?4, diagnosis = ?5
         WHERE id = ?1",
        params![
            id.to_string(),
            fmt_datetime(scheduled_at),
            reason,
            price_cents,
            diagnosis,
        ],
    )?;

    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "appointment".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

/// Write a validated status, stamping consultation timestamps only when the
/// transition supplies them (NULLs keep the existing values).
pub fn apply_status(
    conn: &Connection,
    id: &Uuid,
    status: AppointmentStatus,
    started_at: Option<&NaiveDateTime>,
    ended_at: Option<&NaiveDateTime>,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE appointments SET status = ?2,
         consultation_started_at = COALESCE(?3, consultation_started_at),
         consultation_ended_at = COALESCE(?4, consultation_ended_at)
         WHERE id = ?1",
        params![
            id.to_string(),
            status.as_str(),
            started_at.map(fmt_datetime),
            ended_at.map(fmt_datetime),
        ],
    )?;

    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "appointment".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

/// Flip the insurer-billing flag and return the new value.
pub fn toggle_mutuelle(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE appointments SET mutuelle = 1 - mutuelle WHERE id = ?1",
        params![id.to_string()],
    )?;

    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "appointment".into(),
            id: id.to_string(),
        });
    }

    let value: i64 = conn.query_row(
        "SELECT mutuelle FROM appointments WHERE id = ?1",
        params![id.to_string()],
        |row| row.get(0),
    )?;
    Ok(value != 0)
}

/// Hard delete. Case description and pivot rows go with it via cascade;
/// patient and catalog rows are untouched.
pub fn delete_appointment(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "DELETE FROM appointments WHERE id = ?1",
        params![id.to_string()],
    )?;

    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "appointment".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

// ── Medication / analysis attachments ───────────────────────

/// Attach a medication with its posology. Re-attaching the same medication
/// updates the posology in place.
pub fn attach_medication(
    conn: &Connection,
    appointment_id: &Uuid,
    medication_id: &Uuid,
    posology: &Posology,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO appointment_medications (appointment_id, medication_id, dosage, frequency, duration_days)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(appointment_id, medication_id)
         DO UPDATE SET dosage = ?3, frequency = ?4, duration_days = ?5",
        params![
            appointment_id.to_string(),
            medication_id.to_string(),
            posology.dosage,
            posology.frequency,
            posology.duration_days,
        ],
    )?;
    Ok(())
}

/// Attach several medications atomically — either every pivot row lands or
/// none do.
pub fn attach_medications(
    conn: &Connection,
    appointment_id: &Uuid,
    items: &[(Uuid, Posology)],
) -> Result<(), DatabaseError> {
    let tx = conn.unchecked_transaction()?;
    for (medication_id, posology) in items {
        attach_medication(&tx, appointment_id, medication_id, posology)?;
    }
    tx.commit()?;
    Ok(())
}

pub fn detach_medication(
    conn: &Connection,
    appointment_id: &Uuid,
    medication_id: &Uuid,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "DELETE FROM appointment_medications WHERE appointment_id = ?1 AND medication_id = ?2",
        params![appointment_id.to_string(), medication_id.to_string()],
    )?;

    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "appointment_medication".into(),
            id: medication_id.to_string(),
        });
    }
    Ok(())
}

pub fn medications_for_appointment(
    conn: &Connection,
    appointment_id: &Uuid,
) -> Result<Vec<PrescribedMedication>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT m.id, m.name, am.dosage, am.frequency, am.duration_days
         FROM appointment_medications am
         JOIN medications m ON m.id = am.medication_id
         WHERE am.appointment_id = ?1
         ORDER BY m.name",
    )?;

    let rows = stmt.query_map(params![appointment_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<String>>(2)?,
            row.get::<_, Option<String>>(3)?,
            row.get::<_, Option<i64>>(4)?,
        ))
    })?;

    let mut meds = Vec::new();
    for row in rows {
        let (id, name, dosage, frequency, duration_days) = row?;
        meds.push(PrescribedMedication {
            medication_id: parse_uuid(&id)?,
            name,
            dosage,
            frequency,
            duration_days,
        });
    }
    Ok(meds)
}

pub fn attach_analysis(
    conn: &Connection,
    appointment_id: &Uuid,
    analysis_id: &Uuid,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT OR IGNORE INTO appointment_analyses (appointment_id, analysis_id) VALUES (?1, ?2)",
        params![appointment_id.to_string(), analysis_id.to_string()],
    )?;
    Ok(())
}

/// Attach several analyses atomically.
pub fn attach_analyses(
    conn: &Connection,
    appointment_id: &Uuid,
    analysis_ids: &[Uuid],
) -> Result<(), DatabaseError> {
    let tx = conn.unchecked_transaction()?;
    for analysis_id in analysis_ids {
        attach_analysis(&tx, appointment_id, analysis_id)?;
    }
    tx.commit()?;
    Ok(())
}

pub fn detach_analysis(
    conn: &Connection,
    appointment_id: &Uuid,
    analysis_id: &Uuid,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "DELETE FROM appointment_analyses WHERE appointment_id = ?1 AND analysis_id = ?2",
        params![appointment_id.to_string(), analysis_id.to_string()],
    )?;

    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "appointment_analysis".into(),
            id: analysis_id.to_string(),
        });
    }
    Ok(())
}

pub fn analyses_for_appointment(
    conn: &Connection,
    appointment_id: &Uuid,
) -> Result<Vec<RequestedAnalysis>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT a.id, a.kind, a.department
         FROM appointment_analyses aa
         JOIN analyses a ON a.id = aa.analysis_id
         WHERE aa.appointment_id = ?1
         ORDER BY a.kind",
    )?;

    let rows = stmt.query_map(params![appointment_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<String>>(2)?,
        ))
    })?;

    let mut analyses = Vec::new();
    for row in rows {
        let (id, kind, department) = row?;
        analyses.push(RequestedAnalysis {
            analysis_id: parse_uuid(&id)?,
            kind,
            department,
        });
    }
    Ok(analyses)
}

// ── Case description ────────────────────────────────────────

/// Create or replace the case description of an appointment (one per visit).
pub fn upsert_case_description(
    conn: &Connection,
    case: &CaseDescription,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO case_descriptions (id, appointment_id, case_notes, weight_kg, height_cm,
         pulse_bpm, temperature_c, bp_systolic, bp_diastolic, spo2_pct, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
         ON CONFLICT(appointment_id) DO UPDATE SET
         case_notes = ?3, weight_kg = ?4, height_cm = ?5, pulse_bpm = ?6,
         temperature_c = ?7, bp_systolic = ?8, bp_diastolic = ?9, spo2_pct = ?10, notes = ?11",
        params![
            case.id.to_string(),
            case.appointment_id.to_string(),
            case.case_notes,
            case.weight_kg,
            case.height_cm,
            case.pulse_bpm,
            case.temperature_c,
            case.bp_systolic,
            case.bp_diastolic,
            case.spo2_pct,
            case.notes,
        ],
    )?;
    Ok(())
}

pub fn get_case_description(
    conn: &Connection,
    appointment_id: &Uuid,
) -> Result<Option<CaseDescription>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, appointment_id, case_notes, weight_kg, height_cm, pulse_bpm,
             temperature_c, bp_systolic, bp_diastolic, spo2_pct, notes
             FROM case_descriptions WHERE appointment_id = ?1",
            params![appointment_id.to_string()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<f64>>(3)?,
                    row.get::<_, Option<f64>>(4)?,
                    row.get::<_, Option<i64>>(5)?,
                    row.get::<_, Option<f64>>(6)?,
                    row.get::<_, Option<i64>>(7)?,
                    row.get::<_, Option<i64>>(8)?,
                    row.get::<_, Option<i64>>(9)?,
                    row.get::<_, Option<String>>(10)?,
                ))
            },
        )
        .optional()?;

    match row {
        None => Ok(None),
        Some((
            id,
            appointment_id,
            case_notes,
            weight_kg,
            height_cm,
            pulse_bpm,
            temperature_c,
            bp_systolic,
            bp_diastolic,
            spo2_pct,
            notes,
        )) => Ok(Some(CaseDescription {
            id: parse_uuid(&id)?,
            appointment_id: parse_uuid(&appointment_id)?,
            case_notes,
            weight_kg,
            height_cm,
            pulse_bpm,
            temperature_c,
            bp_systolic,
            bp_diastolic,
            spo2_pct,
            notes,
        })),
    }
}

// ── Patient-centric queries ─────────────────────────────────

/// Most recent appointment strictly before `now`.
pub fn last_appointment_before(
    conn: &Connection,
    patient_id: &Uuid,
    now: &NaiveDateTime,
) -> Result<Option<Appointment>, DatabaseError> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {APPOINTMENT_COLUMNS} FROM appointments
                 WHERE patient_id = ?1 AND scheduled_at < ?2
                 ORDER BY scheduled_at DESC LIMIT 1"
            ),
            params![patient_id.to_string(), fmt_datetime(now)],
            appointment_row_from_rusqlite,
        )
        .optional()?;

    row.map(appointment_from_row).transpose()
}

/// Earliest appointment at or after `now` that is still live (not completed
/// or canceled).
pub fn next_appointment_after(
    conn: &Connection,
    patient_id: &Uuid,
    now: &NaiveDateTime,
) -> Result<Option<Appointment>, DatabaseError> {
    let row = conn
        .query_row(
            &format!(
                "SELECT {APPOINTMENT_COLUMNS} FROM appointments
                 WHERE patient_id = ?1 AND scheduled_at >= ?2
                   AND status NOT IN ('completed', 'canceled')
                 ORDER BY scheduled_at LIMIT 1"
            ),
            params![patient_id.to_string(), fmt_datetime(now)],
            appointment_row_from_rusqlite,
        )
        .optional()?;

    row.map(appointment_from_row).transpose()
}

/// Last N medications prescribed to a patient, newest visit first.
pub fn recent_medications_for_patient(
    conn: &Connection,
    patient_id: &Uuid,
    limit: u32,
) -> Result<Vec<PrescribedMedication>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT m.id, m.name, am.dosage, am.frequency, am.duration_days
         FROM appointment_medications am
         JOIN appointments a ON a.id = am.appointment_id
         JOIN medications m ON m.id = am.medication_id
         WHERE a.patient_id = ?1
         ORDER BY a.scheduled_at DESC, m.name
         LIMIT ?2",
    )?;

    let rows = stmt.query_map(params![patient_id.to_string(), limit], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<String>>(2)?,
            row.get::<_, Option<String>>(3)?,
            row.get::<_, Option<i64>>(4)?,
        ))
    })?;

    let mut meds = Vec::new();
    for row in rows {
        let (id, name, dosage, frequency, duration_days) = row?;
        meds.push(PrescribedMedication {
            medication_id: parse_uuid(&id)?,
            name,
            dosage,
            frequency,
            duration_days,
        });
    }
    Ok(meds)
}

/// Appointment counts per calendar month of a year (index 0 = January).
pub fn monthly_counts(conn: &Connection, year: i32) -> Result<[u32; 12], DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT CAST(strftime('%m', scheduled_at) AS INTEGER), COUNT(*)
         FROM appointments
         WHERE strftime('%Y', scheduled_at) = ?1
         GROUP BY 1",
    )?;

    let rows = stmt.query_map(params![format!("{year:04}")], |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
    })?;

    let mut counts = [0u32; 12];
    for row in rows {
        let (month, count) = row?;
        if (1..=12).contains(&month) {
            counts[(month - 1) as usize] = count as u32;
        }
    }
    Ok(counts)
}

// Internal row type for Appointment mapping
struct AppointmentRow {
    id: String,
    patient_id: String,
    scheduled_at: String,
    reason: Option<String>,
    status: String,
    mutuelle: i32,
    price_cents: Option<i64>,
    diagnosis: Option<String>,
    consultation_started_at: Option<String>,
    consultation_ended_at: Option<String>,
    created_at: String,
}

fn appointment_row_from_rusqlite(
    row: &rusqlite::Row<'_>,
) -> Result<AppointmentRow, rusqlite::Error> {
    Ok(AppointmentRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        scheduled_at: row.get(2)?,
        reason: row.get(3)?,
        status: row.get(4)?,
        mutuelle: row.get(5)?,
        price_cents: row.get(6)?,
        diagnosis: row.get(7)?,
        consultation_started_at: row.get(8)?,
        consultation_ended_at: row.get(9)?,
        created_at: row.get(10)?,
    })
}

fn appointment_from_row(row: AppointmentRow) -> Result<Appointment, DatabaseError> {
    Ok(Appointment {
        id: parse_uuid(&row.id)?,
        patient_id: parse_uuid(&row.patient_id)?,
        scheduled_at: parse_datetime(&row.scheduled_at)?,
        reason: row.reason,
        status: AppointmentStatus::from_str(&row.status)?,
        mutuelle: row.mutuelle != 0,
        price_cents: row.price_cents,
        diagnosis: row.diagnosis,
        consultation_started_at: row
            .consultation_started_at
            .as_deref()
            .map(parse_datetime)
            .transpose()?,
        consultation_ended_at: row
            .consultation_ended_at
            .as_deref()
            .map(parse_datetime)
            .transpose()?,
        created_at: parse_datetime(&row.created_at)?,
    })
}
