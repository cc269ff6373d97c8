//! Per-user settings: read with defaults, replace as a whole.

use axum::extract::State;
use axum::{Extension, Json};
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, AuthedUser};
use crate::db;
use crate::models::enums::Weekday;
use crate::models::UserSettings;

/// `GET /api/settings` — the caller's row, or typed defaults before the
/// first save.
pub async fn get(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthedUser>,
) -> Result<Json<UserSettings>, ApiError> {
    let conn = ctx.core.open_db()?;
    let settings = db::get_settings(&conn, &user.user_id)?
        .unwrap_or_else(|| UserSettings::defaults_for(user.user_id));
    Ok(Json(settings))
}

#[derive(Deserialize)]
pub struct SettingsPayload {
    pub default_duration_minutes: i64,
    pub working_days: Vec<Weekday>,
    pub day_starts_at: String,
    pub day_ends_at: String,
    pub reminders_enabled: bool,
    pub reminder_lead_minutes: i64,
    pub locale: String,
    pub practice_name: String,
    pub practice_address: String,
    pub practice_phone: String,
    pub session_timeout_minutes: i64,
    #[serde(default)]
    pub drive_token: Option<serde_json::Value>,
}

/// `PUT /api/settings` — whole-row replace, no partial merge.
pub async fn put(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<AuthedUser>,
    Json(payload): Json<SettingsPayload>,
) -> Result<Json<UserSettings>, ApiError> {
    if payload.default_duration_minutes <= 0 {
        return Err(ApiError::Validation {
            field: "default_duration_minutes",
            message: "duration must be positive".into(),
        });
    }

    let settings = UserSettings {
        user_id: user.user_id,
        default_duration_minutes: payload.default_duration_minutes,
        working_days: payload.working_days,
        day_starts_at: payload.day_starts_at,
        day_ends_at: payload.day_ends_at,
        reminders_enabled: payload.reminders_enabled,
        reminder_lead_minutes: payload.reminder_lead_minutes,
        locale: payload.locale,
        practice_name: payload.practice_name,
        practice_address: payload.practice_address,
        practice_phone: payload.practice_phone,
        session_timeout_minutes: payload.session_timeout_minutes,
        drive_token: payload.drive_token,
    };

    let conn = ctx.core.open_db()?;
    db::upsert_settings(&conn, &settings)?;
    Ok(Json(settings))
}
