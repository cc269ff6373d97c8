//! Appointment status workflow.
//!
//! The six statuses form an explicit transition table: forward through the
//! day-of queue (scheduled → waiting → preparing → consulting → completed),
//! backward moves within the queue, cancellation from any live state, and
//! re-activation of canceled visits. `completed` is terminal.
//!
//! Entering `consulting` stamps the consultation start (first time only);
//! completing stamps the end, clamped so it never precedes the start.

use chrono::NaiveDateTime;
use rusqlite::Connection;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::db::{self, DatabaseError};
use crate::models::enums::AppointmentStatus;
use crate::models::Appointment;

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("illegal status transition: {} -> {}", from.as_str(), to.as_str())]
    IllegalTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Legal next statuses for a given current status.
pub fn valid_transitions(from: AppointmentStatus) -> &'static [AppointmentStatus] {
    use AppointmentStatus::*;
    match from {
        Scheduled => &[Waiting, Canceled],
        Waiting => &[Preparing, Consulting, Scheduled, Canceled],
        Preparing => &[Consulting, Waiting, Canceled],
        Consulting => &[Completed, Preparing, Canceled],
        // Terminal — completed visits are history
        Completed => &[],
        Canceled => &[Scheduled],
    }
}

pub fn can_transition(from: AppointmentStatus, to: AppointmentStatus) -> bool {
    valid_transitions(from).contains(&to)
}

/// The column writes a validated transition implies.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub status: AppointmentStatus,
    pub started_at: Option<NaiveDateTime>,
    pub ended_at: Option<NaiveDateTime>,
}

/// Validate a transition against the table and compute consultation stamps.
pub fn plan_transition(
    current: &Appointment,
    to: AppointmentStatus,
    now: NaiveDateTime,
) -> Result<StatusChange, WorkflowError> {
    if !can_transition(current.status, to) {
        warn!(
            appointment = %current.id,
            from = current.status.as_str(),
            to = to.as_str(),
            "Rejected status transition"
        );
        return Err(WorkflowError::IllegalTransition {
            from: current.status,
            to,
        });
    }

    let started_at = match to {
        // First entry into consulting starts the clock; re-entry keeps it
        AppointmentStatus::Consulting if current.consultation_started_at.is_none() => Some(now),
        _ => None,
    };

    let ended_at = match to {
        // End must not precede the recorded start
        AppointmentStatus::Completed => match current.consultation_started_at {
            Some(start) if now < start => Some(start),
            _ => Some(now),
        },
        _ => None,
    };

    debug!(
        appointment = %current.id,
        from = current.status.as_str(),
        to = to.as_str(),
        "Planned status transition"
    );

    Ok(StatusChange {
        status: to,
        started_at,
        ended_at,
    })
}

/// Load, validate, persist and return the updated appointment. On rejection
/// the stored row is left untouched.
pub fn update_status(
    conn: &Connection,
    id: &Uuid,
    to: AppointmentStatus,
    now: NaiveDateTime,
) -> Result<Appointment, WorkflowError> {
    let current = db::get_appointment(conn, id)?;
    let change = plan_transition(&current, to, now)?;

    db::apply_status(
        conn,
        id,
        change.status,
        change.started_at.as_ref(),
        change.ended_at.as_ref(),
    )?;

    Ok(db::get_appointment(conn, id)?)
}
