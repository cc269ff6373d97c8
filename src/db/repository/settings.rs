use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::enums::Weekday;
use crate::models::UserSettings;

use super::parse_uuid;

/// Load a user's settings row. Returns `None` when the user never saved one;
/// callers fall back to `UserSettings::defaults_for`.
pub fn get_settings(
    conn: &Connection,
    user_id: &Uuid,
) -> Result<Option<UserSettings>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT user_id, default_duration_minutes, working_days, day_starts_at, day_ends_at,
             reminders_enabled, reminder_lead_minutes, locale, practice_name, practice_address,
             practice_phone, session_timeout_minutes, drive_token
             FROM user_settings WHERE user_id = ?1",
            params![user_id.to_string()],
            settings_row,
        )
        .optional()?;

    row.map(settings_from_row).transpose()
}

/// Replace the whole settings row (upsert). Read/replace semantics — there is
/// no partial merge.
pub fn upsert_settings(conn: &Connection, settings: &UserSettings) -> Result<(), DatabaseError> {
    let working_days = serde_json::to_string(&settings.working_days)
        .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?;
    let drive_token = settings
        .drive_token
        .as_ref()
        .map(|t| t.to_string());

    conn.execute(
        "INSERT INTO user_settings (user_id, default_duration_minutes, working_days,
         day_starts_at, day_ends_at, reminders_enabled, reminder_lead_minutes, locale,
         practice_name, practice_address, practice_phone, session_timeout_minutes,
         drive_token, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, datetime('now'))
         ON CONFLICT(user_id) DO UPDATE SET
         default_duration_minutes = ?2, working_days = ?3, day_starts_at = ?4,
         day_ends_at = ?5, reminders_enabled = ?6, reminder_lead_minutes = ?7, locale = ?8,
         practice_name = ?9, practice_address = ?10, practice_phone = ?11,
         session_timeout_minutes = ?12, drive_token = ?13, updated_at = datetime('now')",
        params![
            settings.user_id.to_string(),
            settings.default_duration_minutes,
            working_days,
            settings.day_starts_at,
            settings.day_ends_at,
            settings.reminders_enabled as i32,
            settings.reminder_lead_minutes,
            settings.locale,
            settings.practice_name,
            settings.practice_address,
            settings.practice_phone,
            settings.session_timeout_minutes,
            drive_token,
        ],
    )?;
    Ok(())
}

type SettingsRow = (
    String,
    i64,
    String,
    String,
    String,
    i32,
    i64,
    String,
    String,
    String,
    String,
    i64,
    Option<String>,
);

fn settings_row(row: &rusqlite::Row<'_>) -> Result<SettingsRow, rusqlite::Error> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
        row.get(10)?,
        row.get(11)?,
        row.get(12)?,
    ))
}

fn settings_from_row(row: SettingsRow) -> Result<UserSettings, DatabaseError> {
    let (
        user_id,
        default_duration_minutes,
        working_days,
        day_starts_at,
        day_ends_at,
        reminders_enabled,
        reminder_lead_minutes,
        locale,
        practice_name,
        practice_address,
        practice_phone,
        session_timeout_minutes,
        drive_token,
    ) = row;

    let working_days: Vec<Weekday> = serde_json::from_str(&working_days)
        .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?;
    let drive_token = drive_token
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .map_err(|e: serde_json::Error| DatabaseError::ConstraintViolation(e.to_string()))?;

    Ok(UserSettings {
        user_id: parse_uuid(&user_id)?,
        default_duration_minutes,
        working_days,
        day_starts_at,
        day_ends_at,
        reminders_enabled: reminders_enabled != 0,
        reminder_lead_minutes,
        locale,
        practice_name,
        practice_address,
        practice_phone,
        session_timeout_minutes,
        drive_token,
    })
}
