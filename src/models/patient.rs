use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::Gender;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<Gender>,
    /// National identity number.
    pub cin: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub insurer: Option<String>,
    pub allergies: Option<String>,
    pub chronic_conditions: Option<String>,
    pub last_menstrual_date: Option<NaiveDate>,
    pub archived: bool,
    pub created_at: NaiveDateTime,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
