use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Catalog entry for a lab analysis that can be requested during a visit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    pub id: Uuid,
    pub kind: String,
    pub department: Option<String>,
    pub archived: bool,
}
