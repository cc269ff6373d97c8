use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Catalog entry for a prescribable medication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medication {
    pub id: Uuid,
    pub name: String,
    pub price_cents: Option<i64>,
    pub dosage: Option<String>,
    pub composition: Option<String>,
    pub class: Option<String>,
    pub code: Option<String>,
    pub archived: bool,
}
