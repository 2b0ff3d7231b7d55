// Copyright 2026 The Pente Server Authors
//
// This file is part of Pente Server.
//
// Pente Server is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// Pente Server is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero
// General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with Pente Server. If not, see <https://www.gnu.org/licenses/>.
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! GameSession: in-memory match state and the adjudication core, per
//! spec.md §3 "GameSession" and §4.3.
//!
//! The directional-scan shape of [`GameSession::find_captures`] and
//! [`GameSession::axis_alignment`] is grounded on
//! `GameState::find_taking_cards` in the teacher's `grid_server/src/model.rs`:
//! both walk outward from a just-placed piece along a fixed set of
//! directions, inspecting the cells found there. The teacher scans to the
//! *furthest* matching card and takes everything in between (no fixed
//! length); Pente's capture scan instead checks a fixed three-cell pattern
//! and its alignment scan counts a fixed run length, so the walks are
//! bounded rather than open-ended, but the "walk outward per direction from
//! the placed piece" structure is the same technique.

use serde::{Deserialize, Serialize};

use super::board::{Board, Cell, BOARD_SIZE, CENTER};
use super::player::ConnId;
use crate::error::MoveError;

/// Which side of the match a participant is playing, per spec.md §4.3
/// ("Host plays the 'x' marker, joiner plays the 'o' marker").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Host,
    Joiner,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::Host => Side::Joiner,
            Side::Joiner => Side::Host,
        }
    }

    fn marker(self) -> Cell {
        match self {
            Side::Host => Cell::Host,
            Side::Joiner => Cell::Joiner,
        }
    }
}

/// Lifecycle state of a GameSession, per spec.md §4.3 "State machine".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Waiting,
    Ongoing,
}

/// One participant's identity within a GameSession. The session holds this
/// identifier, not a back-pointer to the Player itself, per spec.md §9
/// ("Ownership graph") — breaks the Player <-> GameSession reference cycle
/// the original C implementation has via raw pointers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub conn_id: ConnId,
    pub name: String,
}

/// Why a match ended in a win, per spec.md §4.3 "Victory conditions".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WinReason {
    Alignment,
    Capture,
}

/// The non-error result of a successfully-applied `play_move`.
pub struct MoveOutcome {
    /// Number of directions captured by this move (0..=8).
    pub captures_this_move: u32,
    /// The mover's cumulative capture count for the session after this move.
    pub mover_total_captures: u32,
    /// Set when this move ends the match.
    pub winner: Option<WinReason>,
}

/// One match's in-memory state, per spec.md §3 "GameSession".
pub struct GameSession {
    pub name: String,
    pub host: Participant,
    pub joiner: Option<Participant>,
    pub status: Status,
    pub board: Board,
    /// Meaningful only when `status == Ongoing`.
    pub current_turn: Option<Side>,
    pub host_captures: u32,
    pub joiner_captures: u32,
}

const DIRECTIONS: [(i32, i32); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

const AXES: [(i32, i32); 4] = [(1, 0), (0, 1), (1, 1), (1, -1)];

/// Captures required to win by capture count, per spec.md §4.3 "Victory
/// conditions".
const CAPTURES_TO_WIN: u32 = 5;

/// Stones in a row required to win by alignment, per spec.md §4.3.
const ALIGNMENT_TO_WIN: i32 = 5;

impl GameSession {
    /// Creates a new `waiting` session with `host` as its sole participant,
    /// per spec.md §3 "Lifecycle: created by `create_game` from a waiting
    /// host".
    pub fn new(name: String, host: Participant) -> Self {
        GameSession {
            name,
            host,
            joiner: None,
            status: Status::Waiting,
            board: Board::empty(),
            current_turn: None,
            host_captures: 0,
            joiner_captures: 0,
        }
    }

    /// True iff `conn_id` is either participant.
    pub fn is_participant(&self, conn_id: ConnId) -> bool {
        self.host.conn_id == conn_id
            || self.joiner.as_ref().is_some_and(|j| j.conn_id == conn_id)
    }

    /// The side `conn_id` is playing, if they are a participant.
    pub fn side_of(&self, conn_id: ConnId) -> Option<Side> {
        if self.host.conn_id == conn_id {
            Some(Side::Host)
        } else if self.joiner.as_ref().is_some_and(|j| j.conn_id == conn_id) {
            Some(Side::Joiner)
        } else {
            None
        }
    }

    fn participant(&self, side: Side) -> &Participant {
        match side {
            Side::Host => &self.host,
            Side::Joiner => self.joiner.as_ref().expect("joiner participates only when seated"),
        }
    }

    /// Fills the joiner slot, per spec.md §4.2 Registry contract ("fills the
    /// first empty slot"). The Registry enforces the "both slots occupied or
    /// ongoing" rejection before calling this; this method assumes the slot
    /// is free.
    pub fn seat_joiner(&mut self, joiner: Participant) {
        self.joiner = Some(joiner);
    }

    /// Promotes a full `waiting` session to `ongoing`, per spec.md §4.3
    /// "Board geometry": seeds the board with the host marker at the center
    /// and hands the first move to the joiner.
    ///
    /// Panics if the session does not have two participants yet; the
    /// ConnectionLoop only calls this after `ready_to_play` observes both
    /// slots filled (spec.md §3 "promoted to ongoing when `ready_to_play`
    /// fires with two participants").
    pub fn start(&mut self) {
        assert!(self.joiner.is_some(), "cannot start a game with one participant");
        self.board = Board::empty();
        self.board.set(CENTER.0, CENTER.1, Cell::Host);
        self.status = Status::Ongoing;
        self.current_turn = Some(Side::Joiner);
        self.host_captures = 0;
        self.joiner_captures = 0;
    }

    /// Adjudicates one `play_move`, per spec.md §4.3 "Move legality",
    /// "Capture rule", "Alignment rule", and "Victory conditions".
    ///
    /// `row` and `col` are the already-range-checked board coordinates; this
    /// method still re-checks bounds and turn/occupancy so it is safe to call
    /// directly from tests.
    pub fn play_move(&mut self, conn_id: ConnId, row: i64, col: i64) -> Result<MoveOutcome, MoveError> {
        if self.status != Status::Ongoing {
            return Err(MoveError::NotOngoing);
        }
        let side = self.side_of(conn_id).ok_or(MoveError::NotAParticipant)?;
        if self.current_turn != Some(side) {
            return Err(MoveError::NotYourTurn);
        }
        if row < 0 || col < 0 || row >= BOARD_SIZE as i64 || col >= BOARD_SIZE as i64 {
            return Err(MoveError::OutOfRange);
        }
        let (row, col) = (row as usize, col as usize);
        if !self.board.is_empty_at(row, col) {
            return Err(MoveError::CellOccupied);
        }

        self.board.set(row, col, side.marker());

        let captures_this_move = self.resolve_captures(side, row, col);
        match side {
            Side::Host => self.host_captures += captures_this_move,
            Side::Joiner => self.joiner_captures += captures_this_move,
        }
        let mover_total_captures = match side {
            Side::Host => self.host_captures,
            Side::Joiner => self.joiner_captures,
        };

        let winner = if self.has_alignment(side, row, col) {
            Some(WinReason::Alignment)
        } else if mover_total_captures >= CAPTURES_TO_WIN {
            Some(WinReason::Capture)
        } else {
            None
        };

        if winner.is_none() {
            self.current_turn = Some(side.opponent());
        }

        Ok(MoveOutcome {
            captures_this_move,
            mover_total_captures,
            winner,
        })
    }

    /// Spec.md §4.3 "Capture rule": inspects all 8 directions from the just
    /// -placed stone at `(row, col)` and clears any flanked opponent pair.
    /// Runs a single pass; captures found in one direction never cascade
    /// into re-checking another.
    fn resolve_captures(&mut self, side: Side, row: usize, col: usize) -> u32 {
        let mine = side.marker();
        let theirs = side.opponent().marker();
        let mut captured_directions = 0;

        for (dr, dc) in DIRECTIONS {
            let p1 = (row as i32 + dr, col as i32 + dc);
            let p2 = (row as i32 + 2 * dr, col as i32 + 2 * dc);
            let p3 = (row as i32 + 3 * dr, col as i32 + 3 * dc);

            if !self.board.in_bounds(p1.0, p1.1)
                || !self.board.in_bounds(p2.0, p2.1)
                || !self.board.in_bounds(p3.0, p3.1)
            {
                continue;
            }

            let c1 = self.board.get(p1.0 as usize, p1.1 as usize);
            let c2 = self.board.get(p2.0 as usize, p2.1 as usize);
            let c3 = self.board.get(p3.0 as usize, p3.1 as usize);

            if c1 == theirs && c2 == theirs && c3 == mine {
                self.board.set(p1.0 as usize, p1.1 as usize, Cell::Empty);
                self.board.set(p2.0 as usize, p2.1 as usize, Cell::Empty);
                captured_directions += 1;
            }
        }

        captured_directions
    }

    /// Spec.md §4.3 "Alignment rule": true if any of the 4 axes through
    /// `(row, col)` reaches a run of 5 or more of `side`'s marker.
    fn has_alignment(&self, side: Side, row: usize, col: usize) -> bool {
        AXES.iter().any(|&axis| self.axis_alignment(side, row, col, axis) >= ALIGNMENT_TO_WIN)
    }

    fn axis_alignment(&self, side: Side, row: usize, col: usize, (dr, dc): (i32, i32)) -> i32 {
        let mine = side.marker();
        1 + self.run_length(row, col, dr, dc, mine) + self.run_length(row, col, -dr, -dc, mine)
    }

    /// Counts consecutive `target` cells starting one step from `(row, col)`
    /// in direction `(dr, dc)`, stopping at the first non-match or board
    /// edge, capped at 4 steps (a 5th stone in either direction cannot add
    /// to a 5-in-a-row check centered on the placed stone).
    fn run_length(&self, row: usize, col: usize, dr: i32, dc: i32, target: Cell) -> i32 {
        let mut count = 0;
        let mut r = row as i32 + dr;
        let mut c = col as i32 + dc;
        while count < 4 && self.board.in_bounds(r, c) && self.board.get(r as usize, c as usize) == target {
            count += 1;
            r += dr;
            c += dc;
        }
        count
    }

    /// Name of the participant on `side`, for response shaping.
    pub fn name_of(&self, side: Side) -> &str {
        &self.participant(side).name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_game() -> GameSession {
        let mut game = GameSession::new(
            "duel1".to_string(),
            Participant { conn_id: 1, name: "alice".into() },
        );
        game.seat_joiner(Participant { conn_id: 2, name: "bob".into() });
        game.start();
        game
    }

    #[test]
    fn seeds_host_marker_at_center_and_hands_first_move_to_joiner() {
        let game = fresh_game();
        assert_eq!(game.board.get(9, 9), Cell::Host);
        assert_eq!(game.current_turn, Some(Side::Joiner));
        assert_eq!(game.status, Status::Ongoing);
    }

    #[test]
    fn rejects_out_of_turn_move() {
        let mut game = fresh_game();
        // host conn_id is 1, but it's joiner's turn
        assert!(matches!(game.play_move(1, 9, 10), Err(MoveError::NotYourTurn)));
    }

    #[test]
    fn rejects_occupied_cell() {
        let mut game = fresh_game();
        assert!(matches!(game.play_move(2, 9, 9), Err(MoveError::CellOccupied)));
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        let mut game = fresh_game();
        assert!(matches!(game.play_move(2, -1, 0), Err(MoveError::OutOfRange)));
        assert!(matches!(game.play_move(2, 19, 0), Err(MoveError::OutOfRange)));
        assert!(matches!(game.play_move(2, 0, 19), Err(MoveError::OutOfRange)));
    }

    #[test]
    fn accepts_all_four_corners_when_empty_and_callers_turn() {
        // Corners can't capture or align from an otherwise-empty board;
        // this only exercises the boundary/legality checks.
        for (row, col) in [(0i64, 0i64), (18, 18), (18, 0), (0, 18)] {
            let mut game = fresh_game();
            // joiner moves first; drain a couple of turns to exercise both
            // sides at the boundary.
            assert!(game.play_move(2, row, col).is_ok());
        }
    }

    #[test]
    fn capture_flanks_two_opponent_stones_along_an_axis() {
        // S2: host "alice" seeded at (9,9). joiner "bob" plays (9,10).
        // alice plays (9,11). bob plays (9,12). alice plays (9,13):
        // row 9 now reads x(9) o(10) o(11-via-alice? ) ... construct the
        // "x o o x" pattern directly instead of replaying S2's narrative,
        // which (per the spec's own caveat) needs care about who holds
        // which cell.
        let mut game = fresh_game();
        // host = x at (9,9) already. Put joiner stones at (9,10) and (9,11).
        game.board.set(9, 10, Cell::Joiner);
        game.board.set(9, 11, Cell::Joiner);
        game.current_turn = Some(Side::Host);
        let outcome = game.play_move(1, 9, 12).unwrap();
        assert_eq!(outcome.captures_this_move, 1);
        assert_eq!(game.board.get(9, 10), Cell::Empty);
        assert_eq!(game.board.get(9, 11), Cell::Empty);
        assert_eq!(game.board.get(9, 12), Cell::Host);
        assert_eq!(game.host_captures, 1);
    }

    #[test]
    fn alignment_of_five_wins() {
        let mut game = fresh_game();
        // lay 4 host stones along row 0, then complete the 5th
        game.board.set(0, 0, Cell::Host);
        game.board.set(0, 1, Cell::Host);
        game.board.set(0, 2, Cell::Host);
        game.board.set(0, 3, Cell::Host);
        game.current_turn = Some(Side::Host);
        let outcome = game.play_move(1, 0, 4).unwrap();
        assert_eq!(outcome.winner, Some(WinReason::Alignment));
    }

    #[test]
    fn five_captures_wins_without_alignment() {
        let mut game = fresh_game();
        game.host_captures = 4;
        // set up one more flank for host, away from any other alignment:
        // anchor stone at (15,9), two joiner stones to its right, host
        // closes the flank at (15,12) giving "x o o x" along the row.
        game.board.set(15, 9, Cell::Host);
        game.board.set(15, 10, Cell::Joiner);
        game.board.set(15, 11, Cell::Joiner);
        game.current_turn = Some(Side::Host);
        let outcome = game.play_move(1, 15, 12).unwrap();
        assert_eq!(outcome.captures_this_move, 1);
        assert_eq!(outcome.mover_total_captures, 5);
        assert_eq!(outcome.winner, Some(WinReason::Capture));
    }

    #[test]
    fn non_terminal_move_hands_turn_to_opponent() {
        let mut game = fresh_game();
        let outcome = game.play_move(2, 9, 10).unwrap();
        assert!(outcome.winner.is_none());
        assert_eq!(game.current_turn, Some(Side::Host));
    }

    #[test]
    fn own_flanking_stone_is_not_removed() {
        let mut game = fresh_game();
        game.board.set(9, 10, Cell::Joiner);
        game.board.set(9, 11, Cell::Joiner);
        game.current_turn = Some(Side::Host);
        game.play_move(1, 9, 12).unwrap();
        // the flanking stone at (9,9) (the pre-existing center seed) remains
        assert_eq!(game.board.get(9, 9), Cell::Host);
    }
}
