//! Appointment board state.
//!
//! The board mirrors server state on the client: six status columns, one card
//! per appointment. A drag is applied optimistically (`begin_move`), the
//! status-update call goes out, then the move is either confirmed or rolled
//! back. The `PendingMove` receipt records exactly where the card came from
//! so a rollback restores the pre-move board.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::enums::AppointmentStatus;
use crate::models::{Appointment, Patient};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardCard {
    pub appointment_id: Uuid,
    pub patient_name: String,
    pub scheduled_at: NaiveDateTime,
    pub mutuelle: bool,
}

impl BoardCard {
    pub fn for_appointment(appointment: &Appointment, patient: &Patient) -> Self {
        Self {
            appointment_id: appointment.id,
            patient_name: patient.full_name(),
            scheduled_at: appointment.scheduled_at,
            mutuelle: appointment.mutuelle,
        }
    }
}

/// Receipt for an optimistic move. Holds the source position for rollback.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMove {
    pub appointment_id: Uuid,
    pub from: AppointmentStatus,
    pub from_index: usize,
    pub to: AppointmentStatus,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum BoardError {
    #[error("appointment {0} is not on the board")]
    UnknownCard(Uuid),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoardState {
    columns: HashMap<AppointmentStatus, Vec<BoardCard>>,
}

impl BoardState {
    pub fn new() -> Self {
        let mut columns = HashMap::new();
        for status in AppointmentStatus::ALL {
            columns.insert(status, Vec::new());
        }
        Self { columns }
    }

    /// Build a board from (status, card) pairs, e.g. the day listing.
    pub fn from_cards(cards: impl IntoIterator<Item = (AppointmentStatus, BoardCard)>) -> Self {
        let mut board = Self::new();
        for (status, card) in cards {
            board.push_card(status, card);
        }
        board
    }

    pub fn push_card(&mut self, status: AppointmentStatus, card: BoardCard) {
        self.columns.entry(status).or_default().push(card);
    }

    pub fn column(&self, status: AppointmentStatus) -> &[BoardCard] {
        self.columns
            .get(&status)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn card_count(&self) -> usize {
        self.columns.values().map(Vec::len).sum()
    }

    fn locate(&self, appointment_id: &Uuid) -> Option<(AppointmentStatus, usize)> {
        for status in AppointmentStatus::ALL {
            if let Some(index) = self.columns[&status]
                .iter()
                .position(|c| &c.appointment_id == appointment_id)
            {
                return Some((status, index));
            }
        }
        None
    }

    /// Optimistically move a card to the tail of the target column and return
    /// the receipt the caller needs for confirm/rollback.
    pub fn begin_move(
        &mut self,
        appointment_id: &Uuid,
        to: AppointmentStatus,
    ) -> Result<PendingMove, BoardError> {
        let (from, from_index) = self
            .locate(appointment_id)
            .ok_or(BoardError::UnknownCard(*appointment_id))?;

        let card = self
            .columns
            .get_mut(&from)
            .map(|col| col.remove(from_index))
            .ok_or(BoardError::UnknownCard(*appointment_id))?;

        self.columns.entry(to).or_default().push(card);

        Ok(PendingMove {
            appointment_id: *appointment_id,
            from,
            from_index,
            to,
        })
    }

    /// The backend accepted the move; the optimistic state is already right.
    pub fn confirm(&mut self, _pending: PendingMove) {}

    /// The backend rejected the move: put the card back where it was.
    pub fn rollback(&mut self, pending: PendingMove) {
        let Some(position) = self.columns[&pending.to]
            .iter()
            .position(|c| c.appointment_id == pending.appointment_id)
        else {
            return;
        };

        let card = self
            .columns
            .get_mut(&pending.to)
            .map(|col| col.remove(position));

        if let Some(card) = card {
            let column = self.columns.entry(pending.from).or_default();
            let index = pending.from_index.min(column.len());
            column.insert(index, card);
        }
    }
}

impl Default for BoardState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn card(name: &str, hour: u32) -> BoardCard {
        BoardCard {
            appointment_id: Uuid::new_v4(),
            patient_name: name.to_string(),
            scheduled_at: NaiveDate::from_ymd_opt(2026, 3, 2)
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap(),
            mutuelle: false,
        }
    }

    fn sample_board() -> (BoardState, Uuid, Uuid, Uuid) {
        let a = card("Amina Berrada", 9);
        let b = card("Karim Alaoui", 10);
        let c = card("Sara Naciri", 11);
        let (ida, idb, idc) = (a.appointment_id, b.appointment_id, c.appointment_id);
        let board = BoardState::from_cards([
            (AppointmentStatus::Scheduled, a),
            (AppointmentStatus::Scheduled, b),
            (AppointmentStatus::Waiting, c),
        ]);
        (board, ida, idb, idc)
    }

    #[test]
    fn cards_build_from_day_listing() {
        let patient = crate::db::repository::patient::tests::sample_patient("Amina", "Berrada");
        let appt = crate::db::repository::appointment::tests::sample_appointment(patient.id, 2, 9);

        let board = BoardState::from_cards([(
            appt.status,
            BoardCard::for_appointment(&appt, &patient),
        )]);

        let cards = board.column(AppointmentStatus::Scheduled);
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].patient_name, "Amina Berrada");
        assert_eq!(cards[0].appointment_id, appt.id);
        assert!(!cards[0].mutuelle);
    }

    #[test]
    fn new_board_has_all_six_columns_empty() {
        let board = BoardState::new();
        for status in AppointmentStatus::ALL {
            assert!(board.column(status).is_empty());
        }
        assert_eq!(board.card_count(), 0);
    }

    #[test]
    fn begin_move_applies_optimistically() {
        let (mut board, ida, ..) = sample_board();

        let pending = board.begin_move(&ida, AppointmentStatus::Waiting).unwrap();
        assert_eq!(pending.from, AppointmentStatus::Scheduled);
        assert_eq!(pending.from_index, 0);
        assert_eq!(pending.to, AppointmentStatus::Waiting);

        assert_eq!(board.column(AppointmentStatus::Scheduled).len(), 1);
        assert_eq!(board.column(AppointmentStatus::Waiting).len(), 2);
        assert_eq!(
            board.column(AppointmentStatus::Waiting)[1].appointment_id,
            ida
        );
    }

    #[test]
    fn confirm_keeps_the_optimistic_state() {
        let (mut board, ida, ..) = sample_board();
        let pending = board.begin_move(&ida, AppointmentStatus::Waiting).unwrap();
        let snapshot = board.clone();

        board.confirm(pending);
        assert_eq!(board, snapshot);
    }

    #[test]
    fn rollback_restores_exact_pre_move_state() {
        let (mut board, _, idb, _) = sample_board();
        let snapshot = board.clone();

        let pending = board.begin_move(&idb, AppointmentStatus::Consulting).unwrap();
        assert_ne!(board, snapshot);

        board.rollback(pending);
        assert_eq!(board, snapshot);
    }

    #[test]
    fn rollback_restores_middle_position() {
        let a = card("Amina Berrada", 9);
        let b = card("Karim Alaoui", 10);
        let c = card("Sara Naciri", 11);
        let idb = b.appointment_id;
        let mut board = BoardState::from_cards([
            (AppointmentStatus::Waiting, a),
            (AppointmentStatus::Waiting, b),
            (AppointmentStatus::Waiting, c),
        ]);
        let snapshot = board.clone();

        let pending = board.begin_move(&idb, AppointmentStatus::Preparing).unwrap();
        assert_eq!(pending.from_index, 1);

        board.rollback(pending);
        assert_eq!(board, snapshot);
    }

    #[test]
    fn unknown_card_is_an_error() {
        let (mut board, ..) = sample_board();
        let ghost = Uuid::new_v4();
        let result = board.begin_move(&ghost, AppointmentStatus::Waiting);
        assert_eq!(result, Err(BoardError::UnknownCard(ghost)));
    }

    #[test]
    fn move_within_same_column_round_trips() {
        let (mut board, ida, ..) = sample_board();
        let snapshot = board.clone();

        // Dropping back onto the source column: optimistic move to tail,
        // rollback restores the head position.
        let pending = board.begin_move(&ida, AppointmentStatus::Scheduled).unwrap();
        board.rollback(pending);
        assert_eq!(board, snapshot);
    }

    #[test]
    fn card_count_is_stable_across_moves() {
        let (mut board, ida, idb, _) = sample_board();
        assert_eq!(board.card_count(), 3);

        let p1 = board.begin_move(&ida, AppointmentStatus::Canceled).unwrap();
        let p2 = board.begin_move(&idb, AppointmentStatus::Waiting).unwrap();
        assert_eq!(board.card_count(), 3);

        board.confirm(p1);
        board.rollback(p2);
        assert_eq!(board.card_count(), 3);
    }
}
