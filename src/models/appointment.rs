use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::AppointmentStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub scheduled_at: NaiveDateTime,
    pub reason: Option<String>,
    pub status: AppointmentStatus,
    /// Insurer-billing flag.
    pub mutuelle: bool,
    pub price_cents: Option<i64>,
    pub diagnosis: Option<String>,
    pub consultation_started_at: Option<NaiveDateTime>,
    pub consultation_ended_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

/// Posology carried on the appointment↔medication pivot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Posology {
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub duration_days: Option<i64>,
}

/// A medication attached to an appointment, joined with its catalog name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrescribedMedication {
    pub medication_id: Uuid,
    pub name: String,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub duration_days: Option<i64>,
}

/// An analysis requested during an appointment, joined with its catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestedAnalysis {
    pub analysis_id: Uuid,
    pub kind: String,
    pub department: Option<String>,
}

/// Free-text case notes and vitals for a single visit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseDescription {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub case_notes: Option<String>,
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    pub pulse_bpm: Option<i64>,
    pub temperature_c: Option<f64>,
    pub bp_systolic: Option<i64>,
    pub bp_diastolic: Option<i64>,
    pub spo2_pct: Option<i64>,
    pub notes: Option<String>,
}
