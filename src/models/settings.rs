use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::Weekday;

/// Per-user practice configuration. One row per user; read/replace semantics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSettings {
    pub user_id: Uuid,
    pub default_duration_minutes: i64,
    pub working_days: Vec<Weekday>,
    /// "HH:MM", local practice time.
    pub day_starts_at: String,
    pub day_ends_at: String,
    pub reminders_enabled: bool,
    pub reminder_lead_minutes: i64,
    pub locale: String,
    pub practice_name: String,
    pub practice_address: String,
    pub practice_phone: String,
    pub session_timeout_minutes: i64,
    /// Opaque OAuth token pair for the Drive link, stored verbatim.
    pub drive_token: Option<serde_json::Value>,
}

impl UserSettings {
    /// Defaults returned before a user has ever saved settings.
    pub fn defaults_for(user_id: Uuid) -> Self {
        Self {
            user_id,
            default_duration_minutes: 30,
            working_days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
            day_starts_at: "08:30".to_string(),
            day_ends_at: "18:00".to_string(),
            reminders_enabled: true,
            reminder_lead_minutes: 60,
            locale: "fr".to_string(),
            practice_name: String::new(),
            practice_address: String::new(),
            practice_phone: String::new(),
            session_timeout_minutes: 120,
            drive_token: None,
        }
    }
}
