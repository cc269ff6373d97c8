//! Certificate endpoints: issue, fetch, delete. Listing lives under the
//! patient routes.

use axum::extract::{Path, State};
use axum::{Extension, Json};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, AuthedUser};
use crate::db;
use crate::models::Certificate;

#[derive(Deserialize)]
pub struct CreateCertificateRequest {
    pub patient_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub content: String,
}

/// `POST /api/certificates`
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(_user): Extension<AuthedUser>,
    Json(req): Json<CreateCertificateRequest>,
) -> Result<Json<Certificate>, ApiError> {
    if req.content.trim().is_empty() {
        return Err(ApiError::Validation {
            field: "content",
            message: "content is required".into(),
        });
    }
    if req.end_date < req.start_date {
        return Err(ApiError::Validation {
            field: "end_date",
            message: "end date precedes start date".into(),
        });
    }

    let conn = ctx.core.open_db()?;
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

    let certificate = Certificate {
        id: Uuid::new_v4(),
        patient_id: req.patient_id,
        start_date: req.start_date,
        end_date: req.end_date,
        content: req.content,
        created_at: chrono::Utc::now().naive_utc(),
    };
    db::insert_certificate(&conn, &certificate)?;

    tracing::info!(certificate = %certificate.id, patient = %certificate.patient_id, "Certificate issued");
    Ok(Json(certificate))
}

/// `GET /api/certificates/:id`
pub async fn get(
    State(ctx): State<ApiContext>,
    Extension(_user): Extension<AuthedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Certificate>, ApiError> {
    let conn = ctx.core.open_db()?;
    let certificate = db::get_certificate(&conn, &id)?;
    Ok(Json(certificate))
}

/// `DELETE /api/certificates/:id` — hard delete, no revocation workflow.
pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(_user): Extension<AuthedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = ctx.core.open_db()?;
    db::delete_certificate(&conn, &id)?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}
