//! Medication catalog endpoints.

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, AuthedUser};
use crate::db;
use crate::models::{Medication, MedicationFilter};

#[derive(Deserialize)]
pub struct MedicationListQuery {
    pub archived: Option<bool>,
}

/// `GET /api/medications?archived=`
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(_user): Extension<AuthedUser>,
    Query(query): Query<MedicationListQuery>,
) -> Result<Json<Vec<Medication>>, ApiError> {
    let conn = ctx.core.open_db()?;
    let filter = MedicationFilter {
        archived: query.archived.unwrap_or(false),
    };
    let medications = db::list_medications(&conn, &filter)?;
    Ok(Json(medications))
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub term: Option<String>,
}

/// `GET /api/medications/search?term=`
pub async fn search(
    State(ctx): State<ApiContext>,
    Extension(_user): Extension<AuthedUser>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Medication>>, ApiError> {
    let conn = ctx.core.open_db()?;
    let medications = db::search_medications(&conn, query.term.as_deref().unwrap_or(""))?;
    Ok(Json(medications))
}

#[derive(Deserialize)]
pub struct MedicationPayload {
    pub name: String,
    #[serde(default)]
    pub price_cents: Option<i64>,
    #[serde(default)]
    pub dosage: Option<String>,
    #[serde(default)]
    pub composition: Option<String>,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

impl MedicationPayload {
    fn validate(&self) -> Result<(), ApiError> {
        if self.name.trim().is_empty() {
            return Err(ApiError::Validation {
                field: "name",
                message: "name is required".into(),
            });
        }
        Ok(())
    }
}

/// `POST /api/medications`
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(_user): Extension<AuthedUser>,
    Json(payload): Json<MedicationPayload>,
) -> Result<Json<Medication>, ApiError> {
    payload.validate()?;
    let conn = ctx.core.open_db()?;

    let medication = Medication {
        id: Uuid::new_v4(),
        name: payload.name.trim().to_string(),
        price_cents: payload.price_cents,
        dosage: payload.dosage,
        composition: payload.composition,
        class: payload.class,
        code: payload.code,
        archived: false,
    };
    db::insert_medication(&conn, &medication)?;
    Ok(Json(medication))
}

/// `GET /api/medications/:id`
pub async fn get(
    State(ctx): State<ApiContext>,
    Extension(_user): Extension<AuthedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Medication>, ApiError> {
    let conn = ctx.core.open_db()?;
    let medication = db::get_medication(&conn, &id)?;
    Ok(Json(medication))
}

/// `PUT /api/medications/:id`
pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(_user): Extension<AuthedUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<MedicationPayload>,
) -> Result<Json<Medication>, ApiError> {
    payload.validate()?;
    let conn = ctx.core.open_db()?;

    let mut medication = db::get_medication(&conn, &id)?;
    medication.name = payload.name.trim().to_string();
    medication.price_cents = payload.price_cents;
    medication.dosage = payload.dosage;
    medication.composition = payload.composition;
    medication.class = payload.class;
    medication.code = payload.code;
    db::update_medication(&conn, &medication)?;

    Ok(Json(medication))
}

/// `PATCH /api/medications/:id/archive`
pub async fn archive(
    State(ctx): State<ApiContext>,
    Extension(_user): Extension<AuthedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Medication>, ApiError> {
    set_archived(&ctx, &id, true)
}

/// `PATCH /api/medications/:id/restore`
pub async fn restore(
    State(ctx): State<ApiContext>,
    Extension(_user): Extension<AuthedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Medication>, ApiError> {
    set_archived(&ctx, &id, false)
}

fn set_archived(ctx: &ApiContext, id: &Uuid, archived: bool) -> Result<Json<Medication>, ApiError> {
    let conn = ctx.core.open_db()?;
    db::set_medication_archived(&conn, id, archived)?;
    let medication = db::get_medication(&conn, id)?;
    Ok(Json(medication))
}
