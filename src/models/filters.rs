use chrono::NaiveDate;
use uuid::Uuid;

use super::enums::AppointmentStatus;

/// Registry listings select by archive flag: the default listing shows the
/// active set, `archived = true` shows the archive instead.
#[derive(Debug, Default)]
pub struct PatientFilter {
    pub archived: bool,
}

#[derive(Debug, Default)]
pub struct MedicationFilter {
    pub archived: bool,
}

#[derive(Debug, Default)]
pub struct AnalysisFilter {
    pub archived: bool,
}

#[derive(Debug, Default)]
pub struct AppointmentFilter {
    pub date: Option<NaiveDate>,
    pub status: Option<AppointmentStatus>,
    pub patient_id: Option<Uuid>,
}
