use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A medical certificate issued to a patient for a validity window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Certificate {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub content: String,
    pub created_at: NaiveDateTime,
}
