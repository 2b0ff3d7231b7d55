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

//! Wire protocol: one JSON object per request and per response, per
//! spec.md §6.
//!
//! Requests are deserialized through a single internally-tagged enum (the
//! `type` field selects the variant) rather than the if/else chain on string
//! comparison the original C implementation uses — this is exactly the
//! "verb -> handler mapping" re-architecture spec.md §9 asks for, applied at
//! the parsing boundary: an unrecognized `type`, or a `type` whose fields
//! don't match, simply fails to deserialize and is handled as
//! `unknown_command` by the caller (spec.md §4.1, §7).

use serde::{Deserialize, Serialize};

use crate::model::{Board, PlayerStats};

/// Status codes used across every response shape, per spec.md §6.
pub mod status {
    pub const FAILURE: u8 = 0;
    pub const SUCCESS: u8 = 1;
    pub const VICTORY: u8 = 2;
    pub const DEFEAT: u8 = 3;
    #[allow(dead_code)] // reserved, not currently produced (spec.md §6)
    pub const DRAW: u8 = 4;
}

/// Classifies a `play_move` coordinate field, per spec.md §4.3 "Move
/// legality": `None` covers both a missing field and a present field that
/// isn't a JSON integer (a string, a float, a bool, ...).
pub fn coordinate(value: &Option<serde_json::Value>) -> Option<i64> {
    value.as_ref().and_then(|v| v.as_i64())
}

/// One decoded client request, per spec.md §4.1 "Verbs dispatched".
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    Auth { username: String, password: String },
    NewAccount { username: String, password: String, conf_password: String },
    GetLobby {},
    Disconnect {},
    CreateGame { game_name: String },
    JoinGame { game_name: String },
    ReadyToPlay {},
    PlayMove {
        /// Accepted as a raw JSON value, not `i64`, so a present-but-wrong-
        /// typed coordinate (a string, a float, ...) still parses as a
        /// `PlayMove` request instead of falling through to
        /// `unknown_command`; [`coordinate`] classifies it afterward. Per
        /// spec.md §4.3, "missing" and "non-integer" are both move-legality
        /// failures handled by the `play_move` handler, not parse failures.
        #[serde(default)]
        x: Option<serde_json::Value>,
        #[serde(default)]
        y: Option<serde_json::Value>,
    },
    QuitGame {},
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub status: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_stats: Option<PlayerStats>,
}
impl AuthResponse {
    pub fn ok(stats: PlayerStats) -> Self {
        Self { kind: "auth_response", status: status::SUCCESS, player_stats: Some(stats) }
    }
    pub fn fail() -> Self {
        Self { kind: "auth_response", status: status::FAILURE, player_stats: None }
    }
}

#[derive(Debug, Serialize)]
pub struct NewAccountResponse {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub status: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_stats: Option<PlayerStats>,
}
impl NewAccountResponse {
    pub fn ok(stats: PlayerStats) -> Self {
        Self { kind: "new_account_response", status: status::SUCCESS, player_stats: Some(stats) }
    }
    pub fn fail() -> Self {
        Self { kind: "new_account_response", status: status::FAILURE, player_stats: None }
    }
}

#[derive(Debug, Serialize)]
pub struct DisconnectAck {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub status: u8,
}
impl Default for DisconnectAck {
    fn default() -> Self {
        Self { kind: "disconnect_ack", status: status::SUCCESS }
    }
}

/// One game's lobby-visible summary, per spec.md §6 `get_lobby_response`.
#[derive(Debug, Serialize)]
pub struct LobbyGame {
    pub id: String,
    pub name: String,
    pub status: &'static str,
    pub host: String,
    pub players: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct GetLobbyResponse {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub status: u8,
    pub total_active_players: usize,
    pub games: Vec<LobbyGame>,
}
impl GetLobbyResponse {
    pub fn ok(total_active_players: usize, games: Vec<LobbyGame>) -> Self {
        Self { kind: "get_lobby_response", status: status::SUCCESS, total_active_players, games }
    }
}

#[derive(Debug, Serialize)]
pub struct GameInfo {
    pub id: String,
    pub name: String,
    pub status: &'static str,
    pub host: String,
    pub players: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateGameResponse {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub status: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game: Option<GameInfo>,
}
impl CreateGameResponse {
    pub fn ok(game: GameInfo) -> Self {
        Self { kind: "create_game_response", status: status::SUCCESS, game: Some(game) }
    }
    pub fn fail() -> Self {
        Self { kind: "create_game_response", status: status::FAILURE, game: None }
    }
}

#[derive(Debug, Serialize)]
pub struct JoinGameResponse {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub status: u8,
}
impl JoinGameResponse {
    pub fn ok() -> Self {
        Self { kind: "join_game_response", status: status::SUCCESS }
    }
    pub fn fail() -> Self {
        Self { kind: "join_game_response", status: status::FAILURE }
    }
}

#[derive(Debug, Serialize)]
pub struct OpponentInfo {
    pub username: String,
}

/// Sent only on failure; success replies with `alert_start_game` instead, per
/// spec.md §6's `ready_to_play` row.
#[derive(Debug, Serialize)]
pub struct ReadyToPlayResponse {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub status: u8,
}
impl Default for ReadyToPlayResponse {
    fn default() -> Self {
        Self { kind: "ready_to_play_response", status: status::FAILURE }
    }
}

/// Pushed to each participant when `ready_to_play` fires, per spec.md §6.
#[derive(Debug, Serialize)]
pub struct AlertStartGame {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub board: Board,
    pub opponent_info: OpponentInfo,
    pub game_name: String,
}
impl AlertStartGame {
    pub fn new(board: Board, opponent_info: OpponentInfo, game_name: String) -> Self {
        Self { kind: "alert_start_game", board, opponent_info, game_name }
    }
}

#[derive(Debug, Serialize)]
pub struct MoveResponse {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub status: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub board_state: Option<Board>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captures: Option<u32>,
}
impl MoveResponse {
    pub fn ok(board_state: Board, captures: u32) -> Self {
        Self { kind: "move_response", status: status::SUCCESS, board_state: Some(board_state), captures: Some(captures) }
    }
    pub fn fail() -> Self {
        Self { kind: "move_response", status: status::FAILURE, board_state: None, captures: None }
    }
}

/// Pushed to the opponent after each applied move, per spec.md §6
/// "Asynchronous server-initiated messages".
#[derive(Debug, Serialize)]
pub struct NewBoardState {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub board: Board,
}
impl NewBoardState {
    pub fn new(board: Board) -> Self {
        Self { kind: "new_board_state", board }
    }
}

#[derive(Debug, Serialize)]
pub struct QuitGameResponse {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub status: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_stats: Option<PlayerStats>,
}
impl QuitGameResponse {
    pub fn ok(stats: PlayerStats) -> Self {
        Self { kind: "quit_game_response", status: status::SUCCESS, player_stats: Some(stats) }
    }
    pub fn fail() -> Self {
        Self { kind: "quit_game_response", status: status::FAILURE, player_stats: None }
    }
}

/// Pushed to both participants on a terminal outcome, per spec.md §6.
#[derive(Debug, Serialize)]
pub struct GameOver {
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// `status::VICTORY` or `status::DEFEAT` (`status::DRAW` is reserved).
    pub status: u8,
    pub player_stats: PlayerStats,
}
impl GameOver {
    pub fn victory(stats: PlayerStats) -> Self {
        Self { kind: "game_over", status: status::VICTORY, player_stats: stats }
    }
    pub fn defeat(stats: PlayerStats) -> Self {
        Self { kind: "game_over", status: status::DEFEAT, player_stats: stats }
    }
}

/// Sent once on connection accept, per spec.md §6.
#[derive(Debug, Serialize)]
pub struct Welcome {
    #[serde(rename = "type")]
    pub kind: &'static str,
}
impl Default for Welcome {
    fn default() -> Self {
        Self { kind: "welcome" }
    }
}

#[derive(Debug, Serialize)]
pub struct UnknownCommand {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub status: u8,
}
impl Default for UnknownCommand {
    fn default() -> Self {
        Self { kind: "unknown_command", status: status::FAILURE }
    }
}

/// Sentinel written to a socket refused for being over the connection cap,
/// per spec.md §4.1 "Admission control".
pub const CAPACITY_REFUSAL_SENTINEL: &str = r#"{"type":"server_full","status":0}"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn play_move_tolerates_missing_coordinates() {
        let req: Request = serde_json::from_str(r#"{"type":"play_move"}"#).unwrap();
        assert!(matches!(req, Request::PlayMove { x: None, y: None }));
    }

    #[test]
    fn play_move_parses_non_integer_coordinates_instead_of_rejecting_the_frame() {
        let req: Request =
            serde_json::from_str(r#"{"type":"play_move","x":"nine","y":3.5}"#).unwrap();
        let Request::PlayMove { x, y } = req else { panic!("expected PlayMove") };
        assert_eq!(coordinate(&x), None);
        assert_eq!(coordinate(&y), None);
    }

    #[test]
    fn coordinate_accepts_json_integers_only() {
        assert_eq!(coordinate(&Some(serde_json::json!(9))), Some(9));
        assert_eq!(coordinate(&Some(serde_json::json!(9.5))), None);
        assert_eq!(coordinate(&Some(serde_json::json!("9"))), None);
        assert_eq!(coordinate(&None), None);
    }

    #[test]
    fn unrecognized_verb_fails_to_parse() {
        let result: Result<Request, _> = serde_json::from_str(r#"{"type":"not_a_verb"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn auth_request_round_trips_fields() {
        let req: Request =
            serde_json::from_str(r#"{"type":"auth","username":"alice","password":"pw1"}"#).unwrap();
        assert!(matches!(req, Request::Auth { username, password } if username == "alice" && password == "pw1"));
    }
}
