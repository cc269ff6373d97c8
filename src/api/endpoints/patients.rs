//! Patient registry endpoints: listing, search, CRUD, archive/restore and
//! the per-patient overview.

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, AuthedUser};
use crate::db;
use crate::models::enums::Gender;
use crate::models::{
    Appointment, Certificate, Patient, PatientDocument, PatientFilter, PrescribedMedication,
};

/// Medications shown in the overview panel.
const OVERVIEW_MEDICATION_COUNT: u32 = 5;

#[derive(Deserialize)]
pub struct PatientListQuery {
    pub archived: Option<bool>,
}

/// `GET /api/patients?archived=` — active set by default, archive on demand.
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(_user): Extension<AuthedUser>,
    Query(query): Query<PatientListQuery>,
) -> Result<Json<Vec<Patient>>, ApiError> {
    let conn = ctx.core.open_db()?;
    let filter = PatientFilter {
        archived: query.archived.unwrap_or(false),
    };
    let patients = db::list_patients(&conn, &filter)?;
    Ok(Json(patients))
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub term: Option<String>,
}

/// `GET /api/patients/search?term=` — substring match; no match is an empty
/// list, never an error.
pub async fn search(
    State(ctx): State<ApiContext>,
    Extension(_user): Extension<AuthedUser>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Patient>>, ApiError> {
    let conn = ctx.core.open_db()?;
    let patients = db::search_patients(&conn, query.term.as_deref().unwrap_or(""))?;
    Ok(Json(patients))
}

#[derive(Deserialize)]
pub struct PatientPayload {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub cin: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub insurer: Option<String>,
    #[serde(default)]
    pub allergies: Option<String>,
    #[serde(default)]
    pub chronic_conditions: Option<String>,
    #[serde(default)]
    pub last_menstrual_date: Option<NaiveDate>,
}

impl PatientPayload {
    fn validate(&self) -> Result<(), ApiError> {
        if self.first_name.trim().is_empty() {
            return Err(ApiError::Validation {
                field: "first_name",
                message: "first name is required".into(),
            });
        }
        if self.last_name.trim().is_empty() {
            return Err(ApiError::Validation {
                field: "last_name",
                message: "last name is required".into(),
            });
        }
        Ok(())
    }

    fn cin(&self) -> Option<&str> {
        self.cin.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }
}

fn check_cin_unique(
    conn: &rusqlite::Connection,
    payload: &PatientPayload,
    exclude: Option<&Uuid>,
) -> Result<(), ApiError> {
    if let Some(cin) = payload.cin() {
        if db::find_active_patient_by_cin(conn, cin, exclude)?.is_some() {
            return Err(ApiError::Validation {
                field: "cin",
                message: "another active patient already holds this CIN".into(),
            });
        }
    }
    Ok(())
}

/// `POST /api/patients` — create a patient record.
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(_user): Extension<AuthedUser>,
    Json(payload): Json<PatientPayload>,
) -> Result<Json<Patient>, ApiError> {
    payload.validate()?;
    let conn = ctx.core.open_db()?;
    check_cin_unique(&conn, &payload, None)?;

    let patient = Patient {
        id: Uuid::new_v4(),
        first_name: payload.first_name.trim().to_string(),
        last_name: payload.last_name.trim().to_string(),
        birth_date: payload.birth_date,
        gender: payload.gender,
        cin: payload.cin().map(str::to_string),
        phone: payload.phone,
        email: payload.email,
        insurer: payload.insurer,
        allergies: payload.allergies,
        chronic_conditions: payload.chronic_conditions,
        last_menstrual_date: payload.last_menstrual_date,
        archived: false,
        created_at: chrono::Utc::now().naive_utc(),
    };
    db::insert_patient(&conn, &patient)?;

    tracing::info!(patient = %patient.id, "Patient created");
    Ok(Json(patient))
}

/// `GET /api/patients/:id`
pub async fn get(
    State(ctx): State<ApiContext>,
    Extension(_user): Extension<AuthedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Patient>, ApiError> {
    let conn = ctx.core.open_db()?;
    let patient = db::get_patient(&conn, &id)?;
    Ok(Json(patient))
}

/// `PUT /api/patients/:id` — full update of editable fields.
pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(_user): Extension<AuthedUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PatientPayload>,
) -> Result<Json<Patient>, ApiError> {
    payload.validate()?;
    let conn = ctx.core.open_db()?;
    check_cin_unique(&conn, &payload, Some(&id))?;

    let mut patient = db::get_patient(&conn, &id)?;
    patient.first_name = payload.first_name.trim().to_string();
    patient.last_name = payload.last_name.trim().to_string();
    patient.birth_date = payload.birth_date;
    patient.gender = payload.gender;
    patient.cin = payload.cin().map(str::to_string);
    patient.phone = payload.phone;
    patient.email = payload.email;
    patient.insurer = payload.insurer;
    patient.allergies = payload.allergies;
    patient.chronic_conditions = payload.chronic_conditions;
    patient.last_menstrual_date = payload.last_menstrual_date;
    db::update_patient(&conn, &patient)?;

    Ok(Json(patient))
}

/// `PATCH /api/patients/:id/archive`
pub async fn archive(
    State(ctx): State<ApiContext>,
    Extension(_user): Extension<AuthedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Patient>, ApiError> {
    set_archived(&ctx, &id, true)
}

/// `PATCH /api/patients/:id/restore`
pub async fn restore(
    State(ctx): State<ApiContext>,
    Extension(_user): Extension<AuthedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Patient>, ApiError> {
    set_archived(&ctx, &id, false)
}

fn set_archived(ctx: &ApiContext, id: &Uuid, archived: bool) -> Result<Json<Patient>, ApiError> {
    let conn = ctx.core.open_db()?;
    db::set_patient_archived(&conn, id, archived)?;
    let patient = db::get_patient(&conn, id)?;
    tracing::info!(patient = %id, archived, "Patient archive flag changed");
    Ok(Json(patient))
}

#[derive(Serialize)]
pub struct PatientOverview {
    pub patient: Patient,
    pub last_appointment: Option<Appointment>,
    pub next_appointment: Option<Appointment>,
    pub recent_medications: Vec<PrescribedMedication>,
}

/// `GET /api/patients/:id/overview` — last/next visit and recent
/// prescriptions relative to now.
pub async fn overview(
    State(ctx): State<ApiContext>,
    Extension(_user): Extension<AuthedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<PatientOverview>, ApiError> {
    let conn = ctx.core.open_db()?;
    let patient = db::get_patient(&conn, &id)?;

    let now = chrono::Utc::now().naive_utc();
    let last_appointment = db::last_appointment_before(&conn, &id, &now)?;
    let next_appointment = db::next_appointment_after(&conn, &id, &now)?;
    let recent_medications =
        db::recent_medications_for_patient(&conn, &id, OVERVIEW_MEDICATION_COUNT)?;

    Ok(Json(PatientOverview {
        patient,
        last_appointment,
        next_appointment,
        recent_medications,
    }))
}

/// `GET /api/patients/:id/appointments` — full visit history.
pub async fn appointments(
    State(ctx): State<ApiContext>,
    Extension(_user): Extension<AuthedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Appointment>>, ApiError> {
    let conn = ctx.core.open_db()?;
    db::get_patient(&conn, &id)?;

    let filter = crate::models::AppointmentFilter {
        patient_id: Some(id),
        ..Default::default()
    };
    let appointments = db::list_appointments(&conn, &filter)?;
    Ok(Json(appointments))
}

/// `GET /api/patients/:id/certificates`
pub async fn certificates(
    State(ctx): State<ApiContext>,
    Extension(_user): Extension<AuthedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Certificate>>, ApiError> {
    let conn = ctx.core.open_db()?;
    db::get_patient(&conn, &id)?;
    let certificates = db::list_certificates_for_patient(&conn, &id)?;
    Ok(Json(certificates))
}

/// `GET /api/patients/:id/documents`
pub async fn documents(
    State(ctx): State<ApiContext>,
    Extension(_user): Extension<AuthedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<PatientDocument>>, ApiError> {
    let conn = ctx.core.open_db()?;
    db::get_patient(&conn, &id)?;
    let documents = db::list_documents_for_patient(&conn, &id)?;
    Ok(Json(documents))
}
