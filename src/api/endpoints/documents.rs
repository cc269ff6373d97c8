//! Patient document metadata endpoints. File bytes are stored outside the
//! backend; these routes track only the catalog entry.

use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, AuthedUser};
use crate::db;
use crate::models::enums::DocumentKind;
use crate::models::PatientDocument;

#[derive(Deserialize)]
pub struct CreateDocumentRequest {
    pub patient_id: Uuid,
    pub name: String,
    pub kind: DocumentKind,
    pub file_path: String,
    #[serde(default)]
    pub size_bytes: Option<i64>,
}

/// `POST /api/documents`
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(_user): Extension<AuthedUser>,
    Json(req): Json<CreateDocumentRequest>,
) -> Result<Json<PatientDocument>, ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::Validation {
            field: "name",
            message: "name is required".into(),
        });
    }
    if req.file_path.trim().is_empty() {
        return Err(ApiError::Validation {
            field: "file_path",
            message: "file path is required".into(),
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

    let document = PatientDocument {
        id: Uuid::new_v4(),
        patient_id: req.patient_id,
        name: req.name.trim().to_string(),
        kind: req.kind,
        file_path: req.file_path,
        size_bytes: req.size_bytes.unwrap_or(0),
        uploaded_at: chrono::Utc::now().naive_utc(),
    };
    db::insert_document(&conn, &document)?;
    Ok(Json(document))
}

/// `GET /api/documents/:id`
pub async fn get(
    State(ctx): State<ApiContext>,
    Extension(_user): Extension<AuthedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<PatientDocument>, ApiError> {
    let conn = ctx.core.open_db()?;
    let document = db::get_document(&conn, &id)?;
    Ok(Json(document))
}

/// `DELETE /api/documents/:id`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Extension(_user): Extension<AuthedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = ctx.core.open_db()?;
    db::delete_document(&conn, &id)?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}
