//! Analysis catalog endpoints. Same registry contract as medications, plus
//! hard delete.

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, AuthedUser};
use crate::db;
use crate::models::{Analysis, AnalysisFilter};

#[derive(Deserialize)]
pub struct AnalysisListQuery {
    pub archived: Option<bool>,
}

/// `GET /api/analyses?archived=`
pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(_user): Extension<AuthedUser>,
    Query(query): Query<AnalysisListQuery>,
) -> Result<Json<Vec<Analysis>>, ApiError> {
    let conn = ctx.core.open_db()?;
    let filter = AnalysisFilter {
        archived: query.archived.unwrap_or(false),
    };
    let analyses = db::list_analyses(&conn, &filter)?;
    Ok(Json(analyses))
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub term: Option<String>,
}

/// `GET /api/analyses/search?term=`
pub async fn search(
    State(ctx): State<ApiContext>,
    Extension(_user): Extension<AuthedUser>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Analysis>>, ApiError> {
    let conn = ctx.core.open_db()?;
    let analyses = db::search_analyses(&conn, query.term.as_deref().unwrap_or(""))?;
    Ok(Json(analyses))
}

#[derive(Deserialize)]
pub struct AnalysisPayload {
    pub kind: String,
    #[serde(default)]
    pub department: Option<String>,
}

impl AnalysisPayload {
    fn validate(&self) -> Result<(), ApiError> {
        if self.kind.trim().is_empty() {
            return Err(ApiError::Validation {
                field: "kind",
                message: "kind is required".into(),
            });
        }
        Ok(())
    }
}

/// `POST /api/analyses`
pub async fn create(
    State(ctx): State<ApiContext>,
    Extension(_user): Extension<AuthedUser>,
    Json(payload): Json<AnalysisPayload>,
) -> Result<Json<Analysis>, ApiError> {
    payload.validate()?;
    let conn = ctx.core.open_db()?;

    let analysis = Analysis {
        id: Uuid::new_v4(),
        kind: payload.kind.trim().to_string(),
        department: payload.department,
        archived: false,
    };
    db::insert_analysis(&conn, &analysis)?;
    Ok(Json(analysis))
}

/// `GET /api/analyses/:id`
pub async fn get(
    State(ctx): State<ApiContext>,
    Extension(_user): Extension<AuthedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Analysis>, ApiError> {
    let conn = ctx.core.open_db()?;
    let analysis = db::get_analysis(&conn, &id)?;
    Ok(Json(analysis))
}

/// `PUT /api/analyses/:id`
pub async fn update(
    State(ctx): State<ApiContext>,
    Extension(_user): Extension<AuthedUser>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AnalysisPayload>,
) -> Result<Json<Analysis>, ApiError> {
    payload.validate()?;
    let conn = ctx.core.open_db()?;

    let mut analysis = db::get_analysis(&conn, &id)?;
    analysis.kind = payload.kind.trim().to_string();
    analysis.department = payload.department;
    db::update_analysis(&conn, &analysis)?;

    Ok(Json(analysis))
}

/// `PATCH /api/analyses/:id/archive`
pub async fn archive(
    State(ctx): State<ApiContext>,
    Extension(_user): Extension<AuthedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Analysis>, ApiError> {
    set_archived(&ctx, &id, true)
}

/// `PATCH /api/analyses/:id/restore`
pub async fn restore(
    State(ctx): State<ApiContext>,
    Extension(_user): Extension<AuthedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Analysis>, ApiError> {
    set_archived(&ctx, &id, false)
}

fn set_archived(ctx: &ApiContext, id: &Uuid, archived: bool) -> Result<Json<Analysis>, ApiError> {
    let conn = ctx.core.open_db()?;
    db::set_analysis_archived(&conn, id, archived)?;
    let analysis = db::get_analysis(&conn, id)?;
    Ok(Json(analysis))
}

/// `DELETE /api/analyses/:id` — hard delete; pivot rows cascade.
pub async fn destroy(
    State(ctx): State<ApiContext>,
    Extension(_user): Extension<AuthedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let conn = ctx.core.open_db()?;
    db::delete_analysis(&conn, &id)?;
    tracing::info!(analysis = %id, "Analysis deleted");
    Ok(Json(serde_json::json!({ "deleted": true })))
}
