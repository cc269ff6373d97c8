//! Appointment endpoints: CRUD, the status workflow, the insurer flag,
//! prescription/analysis attachments, case description and monthly stats.

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, AuthedUser};
use crate::db;
use crate::models::enums::AppointmentStatus;
use crate::models::{
    Appointment, AppointmentFilter, CaseDescription, Posology, PrescribedMedication,
    RequestedAnalysis,
};
use crate::workflow;

#[derive(Deserialize)]
pub struct AppointmentListQuery {
    pub date: Option<NaiveDate>,
    pub status: Option<AppointmentStatus>,
}

/// `GET /api/appointments?date=&status=` — day listing feeds the board.
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(_user): Extension<AuthedUser>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<Vec<Appointment>>, ApiError> {
    let conn = ctx.core.open_db()?;
    let filter = AppointmentFilter {
        date: query.date,
        status: query.status,
        patient_id: None,
    };
    let appointments = db::list_appointments(&conn, &filter)?;
    Ok(Json(appointments))
}

#[derive(Deserialize)]
pub struct CreateAppointmentRequest {
    pub patient_id: Uuid,
    pub scheduled_at: NaiveDateTime,
    #[serde(default)]
    pub reason: Option<String>,
}

/// `POST /api/appointments` — status always starts at `scheduled`.
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(_user): Extension<AuthedUser>,
    Json(req): Json<CreateAppointmentRequest>,
) -> Result<Json<Appointment>, ApiError> {
    let conn = ctx.core.open_db()?;

    // The patient reference must resolve before anything is persisted
    match db::get_patient(&conn, &req.patient_id) {
        Ok(_) => {}
        Err(crate::db::DatabaseError::NotFound { .. }) => {
            return Err(ApiError::Validation {
                field: "patient_id",
                message: "unknown patient".into(),
            });
        }
        Err(e) => return Err(e.into()),
    }

    let appointment = Appointment {
        id: Uuid::new_v4(),
        patient_id: req.patient_id,
        scheduled_at: req.scheduled_at,
        reason: req.reason,
        status: AppointmentStatus::Scheduled,
        mutuelle: false,
        price_cents: None,
        diagnosis: None,
        consultation_started_at: None,
        consultation_ended_at: None,
        created_at: chrono::Utc::now().naive_utc(),
    };
    db::insert_appointment(&conn, &appointment)?;

    tracing::info!(appointment = %appointment.id, patient = %appointment.patient_id, "Appointment created");
    Ok(Json(appointment))
}

#[derive(Serialize)]
pub struct AppointmentDetail {
    pub appointment: Appointment,
    pub medications: Vec<PrescribedMedication>,
    pub analyses: Vec<RequestedAnalysis>,
    pub case_description: Option<CaseDescription>,
}

/// `GET /api/appointments/:id` — the appointment with everything attached.
pub async fn get(
    State(ctx): State<ApiContext>,
    Extension(_user): Extension<AuthedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<AppointmentDetail>, ApiError> {
    let conn = ctx.core.open_db()?;
    let appointment = db::get_appointment(&conn, &id)?;
    let medications = db::medications_for_appointment(&conn, &id)?;
    let analyses = db::analyses_for_appointment(&conn, &id)?;
    let case_description = db::get_case_description(&conn, &id)?;

    Ok(Json(AppointmentDetail {
        appointment,
        medications,
        analyses,
        case_description,
    }))
}

#[derive(Deserialize)]
pub struct UpdateDetailsRequest {
    pub scheduled_at: NaiveDateTime,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub price_cents: Option<i64>,
    #[serde(default)]
    pub diagnosis: Option<String>,
}

/// `PUT /api/appointments/:id/details` — reschedule/billing edits. Status is
/// out of reach here; it only moves through the workflow endpoint.
pub async fn update_details(
    State(ctx): State<ApiContext>,
    Extension(_user): Extension<AuthedUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateDetailsRequest>,
) -> Result<Json<Appointment>, ApiError> {
    let conn = ctx.core.open_db()?;
    db::update_appointment_details(
        &conn,
        &id,
        &req.scheduled_at,
        req.reason.as_deref(),
        req.price_cents,
        req.diagnosis.as_deref(),
    )?;
    let appointment = db::get_appointment(&conn, &id)?;
    Ok(Json(appointment))
}

/// `DELETE /api/appointments/:id` — hard delete; cascades the case
/// description and pivot rows.
pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(_user): Extension<AuthedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = ctx.core.open_db()?;
    db::delete_appointment(&conn, &id)?;
    tracing::info!(appointment = %id, "Appointment deleted");
    Ok(Json(serde_json::json!({ "deleted": true })))
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub id: Uuid,
    pub status: AppointmentStatus,
}

/// `POST /api/appointments/update-status` — drives the transition table.
/// Illegal moves are rejected with a validation error and the stored status
/// is unchanged (the board rolls its card back on this reply).
pub async fn update_status(
    State(ctx): State<ApiContext>,
    Extension(_user): Extension<AuthedUser>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<Appointment>, ApiError> {
    let conn = ctx.core.open_db()?;
    let now = chrono::Utc::now().naive_utc();
    let appointment = workflow::update_status(&conn, &req.id, req.status, now)?;
    Ok(Json(appointment))
}

#[derive(Deserialize)]
pub struct ToggleMutuelleRequest {
    pub id: Uuid,
}

#[derive(Serialize)]
pub struct ToggleMutuelleResponse {
    pub id: Uuid,
    pub mutuelle: bool,
}

/// `POST /api/appointments/toggle-mutuelle`
pub async fn toggle_mutuelle(
    State(ctx): State<ApiContext>,
    Extension(_user): Extension<AuthedUser>,
    Json(req): Json<ToggleMutuelleRequest>,
) -> Result<Json<ToggleMutuelleResponse>, ApiError> {
    let conn = ctx.core.open_db()?;
    let mutuelle = db::toggle_mutuelle(&conn, &req.id)?;
    Ok(Json(ToggleMutuelleResponse { id: req.id, mutuelle }))
}

#[derive(Deserialize)]
pub struct MonthlyStatsQuery {
    pub year: Option<i32>,
}

#[derive(Serialize)]
pub struct MonthlyStatsResponse {
    pub year: i32,
    /// Counts per month, January first.
    pub counts: [u32; 12],
}

/// `GET /api/appointments/stats/monthly?year=`
pub async fn monthly_stats(
    State(ctx): State<ApiContext>,
    Extension(_user): Extension<AuthedUser>,
    Query(query): Query<MonthlyStatsQuery>,
) -> Result<Json<MonthlyStatsResponse>, ApiError> {
    let conn = ctx.core.open_db()?;
    let year = query
        .year
        .unwrap_or_else(|| chrono::Utc::now().naive_utc().year());
    let counts = db::monthly_counts(&conn, year)?;
    Ok(Json(MonthlyStatsResponse { year, counts }))
}

// ── Attachments ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct AttachMedicationItem {
    pub medication_id: Uuid,
    #[serde(default)]
    pub dosage: Option<String>,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub duration_days: Option<i64>,
}

#[derive(Deserialize)]
pub struct AttachMedicationsRequest {
    pub medications: Vec<AttachMedicationItem>,
}

/// `POST /api/appointments/:id/medications` — attach one or more medications
/// with their posology, atomically.
pub async fn attach_medications(
    State(ctx): State<ApiContext>,
    Extension(_user): Extension<AuthedUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<AttachMedicationsRequest>,
) -> Result<Json<Vec<PrescribedMedication>>, ApiError> {
    if req.medications.is_empty() {
        return Err(ApiError::Validation {
            field: "medications",
            message: "at least one medication is required".into(),
        });
    }

    let conn = ctx.core.open_db()?;
    db::get_appointment(&conn, &id)?;

    // Catalog references must all resolve before the batch is written
    for item in &req.medications {
        match db::get_medication(&conn, &item.medication_id) {
            Ok(_) => {}
            Err(crate::db::DatabaseError::NotFound { .. }) => {
                return Err(ApiError::Validation {
                    field: "medication_id",
                    message: format!("unknown medication {}", item.medication_id),
                });
            }
            Err(e) => return Err(e.into()),
        }
    }

    let items: Vec<(Uuid, Posology)> = req
        .medications
        .into_iter()
        .map(|item| {
            (
                item.medication_id,
                Posology {
                    dosage: item.dosage,
                    frequency: item.frequency,
                    duration_days: item.duration_days,
                },
            )
        })
        .collect();
    db::attach_medications(&conn, &id, &items)?;

    let medications = db::medications_for_appointment(&conn, &id)?;
    Ok(Json(medications))
}

/// `DELETE /api/appointments/:id/medications/:medication_id`
pub async fn detach_medication(
    State(ctx): State<ApiContext>,
    Extension(_user): Extension<AuthedUser>,
    Path((id, medication_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Vec<PrescribedMedication>>, ApiError> {
    let conn = ctx.core.open_db()?;
    db::detach_medication(&conn, &id, &medication_id)?;
    let medications = db::medications_for_appointment(&conn, &id)?;
    Ok(Json(medications))
}

#[derive(Deserialize)]
pub struct AttachAnalysesRequest {
    pub analysis_ids: Vec<Uuid>,
}

/// `POST /api/appointments/:id/analyses`
pub async fn attach_analyses(
    State(ctx): State<ApiContext>,
    Extension(_user): Extension<AuthedUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<AttachAnalysesRequest>,
) -> Result<Json<Vec<RequestedAnalysis>>, ApiError> {
    if req.analysis_ids.is_empty() {
        return Err(ApiError::Validation {
            field: "analysis_ids",
            message: "at least one analysis is required".into(),
        });
    }

    let conn = ctx.core.open_db()?;
    db::get_appointment(&conn, &id)?;

    for analysis_id in &req.analysis_ids {
        match db::get_analysis(&conn, analysis_id) {
            Ok(_) => {}
            Err(crate::db::DatabaseError::NotFound { .. }) => {
                return Err(ApiError::Validation {
                    field: "analysis_ids",
                    message: format!("unknown analysis {analysis_id}"),
                });
            }
            Err(e) => return Err(e.into()),
        }
    }

    db::attach_analyses(&conn, &id, &req.analysis_ids)?;
    let analyses = db::analyses_for_appointment(&conn, &id)?;
    Ok(Json(analyses))
}

/// `DELETE /api/appointments/:id/analyses/:analysis_id`
pub async fn detach_analysis(
    State(ctx): State<ApiContext>,
    Extension(_user): Extension<AuthedUser>,
    Path((id, analysis_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Vec<RequestedAnalysis>>, ApiError> {
    let conn = ctx.core.open_db()?;
    db::detach_analysis(&conn, &id, &analysis_id)?;
    let analyses = db::analyses_for_appointment(&conn, &id)?;
    Ok(Json(analyses))
}

// ── Case description ────────────────────────────────────────

#[derive(Deserialize)]
pub struct CaseDescriptionPayload {
    #[serde(default)]
    pub case_notes: Option<String>,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub height_cm: Option<f64>,
    #[serde(default)]
    pub pulse_bpm: Option<i64>,
    #[serde(default)]
    pub temperature_c: Option<f64>,
    #[serde(default)]
    pub bp_systolic: Option<i64>,
    #[serde(default)]
    pub bp_diastolic: Option<i64>,
    #[serde(default)]
    pub spo2_pct: Option<i64>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// `GET /api/appointments/:id/case-description`
pub async fn get_case_description(
    State(ctx): State<ApiContext>,
    Extension(_user): Extension<AuthedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Option<CaseDescription>>, ApiError> {
    let conn = ctx.core.open_db()?;
    db::get_appointment(&conn, &id)?;
    let case = db::get_case_description(&conn, &id)?;
    Ok(Json(case))
}

/// `PUT /api/appointments/:id/case-description` — upsert, one per visit.
pub async fn put_case_description(
    State(ctx): State<ApiContext>,
    Extension(_user): Extension<AuthedUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CaseDescriptionPayload>,
) -> Result<Json<CaseDescription>, ApiError> {
    let conn = ctx.core.open_db()?;
    db::get_appointment(&conn, &id)?;

    let case = CaseDescription {
        id: Uuid::new_v4(),
        appointment_id: id,
        case_notes: payload.case_notes,
        weight_kg: payload.weight_kg,
        height_cm: payload.height_cm,
        pulse_bpm: payload.pulse_bpm,
        temperature_c: payload.temperature_c,
        bp_systolic: payload.bp_systolic,
        bp_diastolic: payload.bp_diastolic,
        spo2_pct: payload.spo2_pct,
        notes: payload.notes,
    };
    db::upsert_case_description(&conn, &case)?;

    // Re-read: an upsert over an existing row keeps its original id
    let stored = db::get_case_description(&conn, &id)?
        .ok_or_else(|| ApiError::Internal("case description vanished after upsert".into()))?;
    Ok(Json(stored))
}
