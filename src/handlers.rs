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

//! Verb handlers, per spec.md §9 ("Dynamic dispatch over verbs... Re-
//! architect as a verb -> handler mapping, with each handler being a
//! function from (server, player, request) to response. This isolates
//! routing from logic and makes tests table-driven.").
//!
//! Each handler takes `&mut Server` and the caller's `ConnId` and returns the
//! JSON line to write back to the caller. Side effects that target *other*
//! connections (opponent notifications, game_over pushes) are queued onto
//! those players' outbox channels before the handler returns its own
//! response, which is what satisfies spec.md §5's "push-opponent-
//! notification, then respond-to-caller" ordering requirement without any
//! extra synchronization: both happen inside the same `Arc<Mutex<Server>>`
//! critical section, in that order.

use tracing::{error, info, warn};

use crate::account::{AccountRecord, Column};
use crate::model::game::{Participant, Side, Status, WinReason};
use crate::model::{ConnId, PlayerStats};
use crate::protocol::*;
use crate::score;
use crate::server::Server;

const MAX_NAME_LEN: usize = 49;

fn valid_name(name: &str) -> bool {
    !name.is_empty() && name.chars().count() <= MAX_NAME_LEN && name.chars().all(|c| c.is_ascii_graphic() || c == ' ')
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).expect("response types always serialize")
}

/// Dispatches one decoded request, per spec.md §4.1 "Verbs dispatched".
/// Returns the response line for the caller, and whether the connection
/// should close after it is written (true only for `disconnect`).
pub fn dispatch(server: &mut Server, conn_id: ConnId, request: Request) -> (String, bool) {
    match request {
        Request::Auth { username, password } => (auth(server, conn_id, &username, &password), false),
        Request::NewAccount { username, password, conf_password } => {
            (new_account(server, conn_id, &username, &password, &conf_password), false)
        }
        Request::GetLobby {} => (get_lobby(server), false),
        Request::Disconnect {} => (to_json(&DisconnectAck::default()), true),
        Request::CreateGame { game_name } => (create_game(server, conn_id, &game_name), false),
        Request::JoinGame { game_name } => (join_game(server, conn_id, &game_name), false),
        Request::ReadyToPlay {} => (ready_to_play(server, conn_id), false),
        Request::PlayMove { x, y } => (play_move(server, conn_id, x, y), false),
        Request::QuitGame {} => (quit_game(server, conn_id), false),
    }
}

fn is_authenticated(server: &Server, conn_id: ConnId) -> bool {
    server.registry.player(conn_id).is_some_and(|p| p.is_authenticated())
}

fn auth(server: &mut Server, conn_id: ConnId, username: &str, password: &str) -> String {
    if server.registry.name_is_taken(username) {
        return to_json(&AuthResponse::fail());
    }
    match server.accounts.authenticate(username, password) {
        Ok(Some(record)) => {
            server.registry.authenticate(conn_id, record.id, username.to_string());
            if let Some(p) = server.registry.player_mut(conn_id) {
                p.stats = record.stats();
            }
            info!(player = %username, "authenticated");
            to_json(&AuthResponse::ok(record.stats()))
        }
        Ok(None) => to_json(&AuthResponse::fail()),
        Err(e) => {
            error!(error = %e, "account lookup failed during auth");
            to_json(&AuthResponse::fail())
        }
    }
}

fn new_account(server: &mut Server, conn_id: ConnId, username: &str, password: &str, conf_password: &str) -> String {
    if password != conf_password || !valid_name(username) {
        return to_json(&NewAccountResponse::fail());
    }
    match server.accounts.create(username, password) {
        Ok(record) => {
            server.registry.authenticate(conn_id, record.id, username.to_string());
            if let Some(p) = server.registry.player_mut(conn_id) {
                p.stats = record.stats();
            }
            info!(player = %username, "new account created");
            to_json(&NewAccountResponse::ok(record.stats()))
        }
        Err(e) => {
            warn!(player = %username, error = %e, "new_account failed");
            to_json(&NewAccountResponse::fail())
        }
    }
}

fn get_lobby(server: &Server) -> String {
    let games = server
        .registry
        .list_games()
        .map(|g| LobbyGame {
            id: g.name.clone(),
            name: g.name.clone(),
            status: match g.status {
                Status::Waiting => "waiting",
                Status::Ongoing => "ongoing",
            },
            host: g.host.name.clone(),
            players: std::iter::once(g.host.name.clone())
                .chain(g.joiner.as_ref().map(|j| j.name.clone()))
                .collect(),
        })
        .collect();
    to_json(&GetLobbyResponse::ok(server.active_connections(), games))
}

fn create_game(server: &mut Server, conn_id: ConnId, game_name: &str) -> String {
    if !is_authenticated(server, conn_id) || !valid_name(game_name) {
        return to_json(&CreateGameResponse::fail());
    }
    let Some(player) = server.registry.player(conn_id) else {
        return to_json(&CreateGameResponse::fail());
    };
    if player.current_game.is_some() {
        return to_json(&CreateGameResponse::fail());
    }
    let name = player.name.clone().expect("authenticated players have a name");

    let participant = Participant { conn_id, name: name.clone() };
    match server.registry.create_game(game_name.to_string(), participant) {
        Ok(()) => {
            if let Some(p) = server.registry.player_mut(conn_id) {
                p.current_game = Some(game_name.to_string());
            }
            info!(game = %game_name, host = %name, "game created");
            to_json(&CreateGameResponse::ok(GameInfo {
                id: game_name.to_string(),
                name: game_name.to_string(),
                status: "waiting",
                host: name.clone(),
                players: vec![name],
            }))
        }
        Err(_) => to_json(&CreateGameResponse::fail()),
    }
}

fn join_game(server: &mut Server, conn_id: ConnId, game_name: &str) -> String {
    if !is_authenticated(server, conn_id) {
        return to_json(&JoinGameResponse::fail());
    }
    let Some(player) = server.registry.player(conn_id) else {
        return to_json(&JoinGameResponse::fail());
    };
    if player.current_game.is_some() {
        return to_json(&JoinGameResponse::fail());
    }
    let name = player.name.clone().expect("authenticated players have a name");

    let participant = Participant { conn_id, name: name.clone() };
    match server.registry.join_game(game_name, participant) {
        Ok(()) => {
            if let Some(p) = server.registry.player_mut(conn_id) {
                p.current_game = Some(game_name.to_string());
            }
            info!(game = %game_name, joiner = %name, "joined game");
            to_json(&JoinGameResponse::ok())
        }
        Err(_) => to_json(&JoinGameResponse::fail()),
    }
}

fn ready_to_play(server: &mut Server, conn_id: ConnId) -> String {
    let Some(game_name) = server.registry.find_game_by_participant(conn_id).map(|g| g.name.clone()) else {
        return to_json(&ReadyToPlayResponse::default());
    };

    let (host_conn, joiner_conn, host_name, joiner_name, board) = {
        let Some(game) = server.registry.game_mut(&game_name) else {
            return to_json(&ReadyToPlayResponse::default());
        };
        if game.status != Status::Waiting || game.joiner.is_none() {
            return to_json(&ReadyToPlayResponse::default());
        }
        game.start();
        let joiner = game.joiner.as_ref().expect("checked above");
        (
            game.host.conn_id,
            joiner.conn_id,
            game.host.name.clone(),
            joiner.name.clone(),
            game.board.clone(),
        )
    };

    info!(game = %game_name, %host_name, %joiner_name, "game started");

    let opponent_conn = if conn_id == host_conn { joiner_conn } else { host_conn };
    let opponent_of_opponent_name = if opponent_conn == host_conn { joiner_name.clone() } else { host_name.clone() };
    let opponent_of_caller_name = if conn_id == host_conn { joiner_name } else { host_name };

    if let Some(opponent) = server.registry.player(opponent_conn) {
        opponent.push(&to_json(&AlertStartGame::new(
            board.clone(),
            OpponentInfo { username: opponent_of_opponent_name },
            game_name.clone(),
        )));
    }

    to_json(&AlertStartGame::new(board, OpponentInfo { username: opponent_of_caller_name }, game_name))
}

fn play_move(
    server: &mut Server,
    conn_id: ConnId,
    x: Option<serde_json::Value>,
    y: Option<serde_json::Value>,
) -> String {
    let (Some(x), Some(y)) = (coordinate(&x), coordinate(&y)) else {
        return to_json(&MoveResponse::fail());
    };

    let Some(game_name) = server.registry.find_game_by_participant(conn_id).map(|g| g.name.clone()) else {
        return to_json(&MoveResponse::fail());
    };

    let side = server.registry.game(&game_name).and_then(|g| g.side_of(conn_id));
    let Some(side) = side else {
        return to_json(&MoveResponse::fail());
    };

    let outcome = {
        let game = server.registry.game_mut(&game_name).expect("looked up above");
        game.play_move(conn_id, y, x)
    };

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(_) => return to_json(&MoveResponse::fail()),
    };

    let game = server.registry.game(&game_name).expect("move just applied");
    let board = game.board.clone();
    let opponent_conn = match side {
        Side::Host => game.joiner.as_ref().map(|j| j.conn_id),
        Side::Joiner => Some(game.host.conn_id),
    };

    match outcome.winner {
        None => {
            if let Some(opponent_conn) = opponent_conn {
                if let Some(opponent) = server.registry.player(opponent_conn) {
                    opponent.push(&to_json(&NewBoardState::new(board.clone())));
                }
            }
            to_json(&MoveResponse::ok(board, outcome.captures_this_move))
        }
        Some(reason) => {
            info!(game = %game_name, ?reason, "match decided by alignment/capture");
            let Some(opponent_conn) = opponent_conn else {
                return to_json(&MoveResponse::ok(board, outcome.captures_this_move));
            };
            let (winner_stats, _loser_stats) =
                settle_match(server, &game_name, conn_id, opponent_conn, false, Some(conn_id));
            to_json(&GameOver::victory(winner_stats))
        }
    }
}

fn quit_game(server: &mut Server, conn_id: ConnId) -> String {
    let Some((game_name, status, opponent_conn)) = server.registry.find_game_by_participant(conn_id).map(|game| {
        let opponent_conn = if game.host.conn_id == conn_id {
            game.joiner.as_ref().map(|j| j.conn_id)
        } else {
            Some(game.host.conn_id)
        };
        (game.name.clone(), game.status, opponent_conn)
    }) else {
        return to_json(&QuitGameResponse::fail());
    };

    match (status, opponent_conn) {
        (Status::Ongoing, Some(opponent_conn)) => {
            let (_winner_stats, loser_stats) =
                settle_match(server, &game_name, opponent_conn, conn_id, true, Some(conn_id));
            to_json(&QuitGameResponse::ok(loser_stats))
        }
        _ => {
            server.registry.remove_game(&game_name);
            let stats = server.registry.player(conn_id).map(|p| p.stats).unwrap_or_default();
            to_json(&QuitGameResponse::ok(stats))
        }
    }
}

/// Settles a terminal match outcome, per spec.md §4.3 "Terminal outcomes".
/// Applies the §4.3.1 Elo-shaped score delta, persists both accounts, pushes
/// `game_over` to whichever side isn't `skip_push_for` (the caller, who will
/// receive their own response directly instead), and destroys the session.
///
/// Returns `(winner_stats, loser_stats)` — the caller's updated stats view,
/// whichever side they're on.
fn settle_match(
    server: &mut Server,
    game_name: &str,
    winner_conn: ConnId,
    loser_conn: ConnId,
    forfeit: bool,
    skip_push_for: Option<ConnId>,
) -> (PlayerStats, PlayerStats) {
    let winner_account_id = server.registry.player(winner_conn).and_then(|p| p.account_id);
    let loser_account_id = server.registry.player(loser_conn).and_then(|p| p.account_id);

    let mut winner_stats = server.registry.player(winner_conn).map(|p| p.stats).unwrap_or_default();
    let mut loser_stats = server.registry.player(loser_conn).map(|p| p.stats).unwrap_or_default();

    if let (Some(winner_id), Some(loser_id)) = (winner_account_id, loser_account_id) {
        match settle_accounts(server, winner_id, loser_id, forfeit) {
            Ok((w, l)) => {
                winner_stats = w;
                loser_stats = l;
                if let Some(p) = server.registry.player_mut(winner_conn) {
                    p.stats = winner_stats;
                }
                if let Some(p) = server.registry.player_mut(loser_conn) {
                    p.stats = loser_stats;
                }
            }
            Err(e) => {
                error!(error = %e, "failed to persist match outcome");
            }
        }
    }

    if skip_push_for != Some(winner_conn) {
        if let Some(winner) = server.registry.player(winner_conn) {
            winner.push(&to_json(&GameOver::victory(winner_stats)));
        }
    }
    if skip_push_for != Some(loser_conn) {
        if let Some(loser) = server.registry.player(loser_conn) {
            loser.push(&to_json(&GameOver::defeat(loser_stats)));
        }
    }

    server.registry.remove_game(game_name);
    (winner_stats, loser_stats)
}

fn settle_accounts(
    server: &Server,
    winner_id: i64,
    loser_id: i64,
    forfeit: bool,
) -> Result<(PlayerStats, PlayerStats), crate::error::AccountError> {
    let mut winner: AccountRecord = server
        .accounts
        .lookup_by(Column::Id(winner_id))?
        .ok_or(crate::error::AccountError::NotFound)?;
    let mut loser: AccountRecord = server
        .accounts
        .lookup_by(Column::Id(loser_id))?
        .ok_or(crate::error::AccountError::NotFound)?;

    let delta = score::delta(winner.score, loser.score);
    winner.score += delta;
    winner.wins += 1;
    winner.games_played += 1;

    loser.score -= delta;
    loser.losses += 1;
    loser.games_played += 1;
    if forfeit {
        loser.forfeits += 1;
    }

    server.accounts.update_stats(&winner)?;
    server.accounts.update_stats(&loser)?;

    Ok((winner.stats(), loser.stats()))
}

/// Full connection-termination cleanup, per spec.md §4.1 "Connection
/// termination": forfeits an ongoing match, silently destroys a waiting
/// session the departing player hosted, then removes the player from the
/// Registry. Shared by the `disconnect` verb and by transport-level
/// disconnects (peer close, recv error).
pub fn disconnect_player(server: &mut Server, conn_id: ConnId) {
    let game_context = server.registry.find_game_by_participant(conn_id).map(|game| {
        let opponent_conn = if game.host.conn_id == conn_id {
            game.joiner.as_ref().map(|j| j.conn_id)
        } else {
            Some(game.host.conn_id)
        };
        (game.name.clone(), game.status, opponent_conn)
    });

    if let Some((game_name, status, opponent_conn)) = game_context {
        match (status, opponent_conn) {
            (Status::Ongoing, Some(opponent_conn)) => {
                settle_match(server, &game_name, opponent_conn, conn_id, true, None);
            }
            _ => {
                server.registry.remove_game(&game_name);
            }
        }
    }

    if let Some(player) = server.registry.remove_player(conn_id) {
        if let Some(name) = player.name {
            info!(player = %name, "disconnected");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountStore;
    use tokio::sync::mpsc;

    fn test_server() -> Server {
        Server::new(AccountStore::open_in_memory().unwrap())
    }

    fn connect(server: &mut Server) -> (ConnId, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn_id = server.try_accept(tx).unwrap();
        (conn_id, rx)
    }

    fn do_request(server: &mut Server, conn_id: ConnId, json: &str) -> String {
        let req: Request = serde_json::from_str(json).unwrap();
        dispatch(server, conn_id, req).0
    }

    #[test]
    fn s1_registration_then_login() {
        let mut server = test_server();
        let (conn, _rx) = connect(&mut server);
        let resp = do_request(
            &mut server,
            conn,
            r#"{"type":"new_account","username":"alice","password":"pw1","conf_password":"pw1"}"#,
        );
        let parsed: serde_json::Value = serde_json::from_str(&resp).unwrap();
        assert_eq!(parsed["status"], 1);
        assert_eq!(parsed["player_stats"]["wins"], 0);

        // fresh connection (S1: "Client A reconnects")
        let (conn2, _rx2) = connect(&mut server);
        let resp2 = do_request(&mut server, conn2, r#"{"type":"auth","username":"alice","password":"pw1"}"#);
        let parsed2: serde_json::Value = serde_json::from_str(&resp2).unwrap();
        assert_eq!(parsed2["status"], 1);
    }

    #[test]
    fn s6_duplicate_game_name_is_rejected() {
        let mut server = test_server();
        let (alice, _rx) = connect(&mut server);
        do_request(&mut server, alice, r#"{"type":"new_account","username":"alice","password":"pw1","conf_password":"pw1"}"#);
        let ok = do_request(&mut server, alice, r#"{"type":"create_game","game_name":"duel1"}"#);
        assert_eq!(serde_json::from_str::<serde_json::Value>(&ok).unwrap()["status"], 1);

        let (charlie, _rx2) = connect(&mut server);
        do_request(&mut server, charlie, r#"{"type":"new_account","username":"charlie","password":"pw1","conf_password":"pw1"}"#);
        let dup = do_request(&mut server, charlie, r#"{"type":"create_game","game_name":"duel1"}"#);
        assert_eq!(serde_json::from_str::<serde_json::Value>(&dup).unwrap()["status"], 0);
        assert_eq!(server.registry.player(charlie).unwrap().current_game, None);
    }

    fn setup_ongoing_match(server: &mut Server) -> (ConnId, ConnId) {
        let (alice, _rx1) = connect(server);
        do_request(server, alice, r#"{"type":"new_account","username":"alice","password":"pw1","conf_password":"pw1"}"#);
        do_request(server, alice, r#"{"type":"create_game","game_name":"duel1"}"#);

        let (bob, _rx2) = connect(server);
        do_request(server, bob, r#"{"type":"new_account","username":"bob","password":"pw1","conf_password":"pw1"}"#);
        do_request(server, bob, r#"{"type":"join_game","game_name":"duel1"}"#);
        do_request(server, alice, r#"{"type":"ready_to_play"}"#);
        (alice, bob)
    }

    #[test]
    fn s3_alignment_victory_ends_match_and_updates_stats() {
        let mut server = test_server();
        let (alice, bob) = setup_ongoing_match(&mut server);

        // joiner (bob) moves first per spec.md §4.3; alice needs 4 more
        // moves to land 5 in a row, interleaved with bob's moves. Bob's
        // moves are spaced two columns apart along row 10 so they never
        // form a run of their own.
        let moves = [
            (bob, 0, 10),
            (alice, 0, 0),
            (bob, 2, 10),
            (alice, 0, 1),
            (bob, 4, 10),
            (alice, 0, 2),
            (bob, 6, 10),
            (alice, 0, 3),
            (bob, 8, 10),
        ];
        let mut last = String::new();
        for (player, x, y) in moves {
            last = do_request(&mut server, player, &format!(r#"{{"type":"play_move","x":{x},"y":{y}}}"#));
        }
        // final move: alice completes the vertical run at column 0, row 4
        last = do_request(&mut server, alice, r#"{"type":"play_move","x":0,"y":4}"#);

        let parsed: serde_json::Value = serde_json::from_str(&last).unwrap();
        assert_eq!(parsed["type"], "game_over");
        assert_eq!(parsed["status"], 2);

        let alice_record = server.accounts.lookup_by(Column::Name("alice")).unwrap().unwrap();
        let bob_record = server.accounts.lookup_by(Column::Name("bob")).unwrap().unwrap();
        assert_eq!(alice_record.wins, 1);
        assert_eq!(bob_record.losses, 1);
        assert_eq!(alice_record.games_played, 1);
        assert_eq!(bob_record.games_played, 1);
        assert!(server.registry.game("duel1").is_none());
    }

    #[test]
    fn s5_forfeit_by_disconnect() {
        let mut server = test_server();
        let (alice, bob) = setup_ongoing_match(&mut server);

        disconnect_player(&mut server, bob);

        let alice_record = server.accounts.lookup_by(Column::Name("alice")).unwrap().unwrap();
        let bob_record = server.accounts.lookup_by(Column::Name("bob")).unwrap().unwrap();
        assert_eq!(alice_record.wins, 1);
        assert_eq!(bob_record.losses, 1);
        assert_eq!(bob_record.forfeits, 1);
        assert!(server.registry.game("duel1").is_none());
        assert_eq!(server.registry.player(alice).unwrap().current_game, None);
        assert!(server.registry.player(bob).is_none());
    }

    #[test]
    fn eleventh_connection_is_refused() {
        let mut server = test_server();
        let mut accepted = Vec::new();
        for _ in 0..10 {
            let (tx, rx) = mpsc::unbounded_channel();
            accepted.push((server.try_accept(tx).unwrap(), rx));
        }
        let (tx, _rx) = mpsc::unbounded_channel();
        assert!(server.try_accept(tx).is_none());
        assert_eq!(server.active_connections(), 10);
    }

    #[test]
    fn win_reason_is_reported_for_capture_victories_too() {
        // sanity: WinReason is matched, not just alignment.
        assert_ne!(WinReason::Alignment, WinReason::Capture);
    }
}
