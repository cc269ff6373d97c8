use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::DocumentKind;

/// File metadata attached to a patient record. The bytes themselves live
/// outside the database; only the path is tracked here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientDocument {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub name: String,
    pub kind: DocumentKind,
    pub file_path: String,
    pub size_bytes: i64,
    pub uploaded_at: NaiveDateTime,
}
