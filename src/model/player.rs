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

//! The connected-player data model, per spec.md §3 "Player".

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

/// Identifies one connected socket, assigned by the Registry on accept.
/// Stable for the lifetime of the connection; unrelated to the persistent
/// `AccountRecord` id, which only exists once a player has authenticated.
pub type ConnId = u64;

/// A player's cumulative stats, as returned on the wire (spec.md §6
/// "Player stats payload") and persisted in `AccountRecord`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub score: i64,
    pub wins: u32,
    pub losses: u32,
    pub forfeits: u32,
    pub games_played: u32,
}

/// Whether a connection has completed `auth`/`new_account`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authenticated,
}

/// A connected user, per spec.md §3.
pub struct Player {
    pub conn_id: ConnId,
    /// Push channel back to this player's connection task; the ConnectionLoop
    /// drains it and writes each line to the socket, the way the teacher's
    /// `ServerState::broadcast_state` writes directly to each
    /// `SplitSink<WebSocket, Message>`, generalized to an mpsc channel per
    /// connection so a handler acting on behalf of one player can push to
    /// another without holding that player's socket directly.
    pub outbox: UnboundedSender<String>,
    /// Populated once authenticated; `None` while `auth_state` is
    /// `Unauthenticated`.
    pub account_id: Option<i64>,
    pub auth_state: AuthState,
    /// Display name, unique across the store while authenticated. `None`
    /// until authenticated.
    pub name: Option<String>,
    pub stats: PlayerStats,
    /// Name of the GameSession this player is host or joiner of, if any.
    pub current_game: Option<String>,
}

impl Player {
    pub fn new(conn_id: ConnId, outbox: UnboundedSender<String>) -> Self {
        Player {
            conn_id,
            outbox,
            account_id: None,
            auth_state: AuthState::Unauthenticated,
            name: None,
            stats: PlayerStats::default(),
            current_game: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth_state == AuthState::Authenticated
    }

    /// Sends a line-encoded message to this player. Mirrors
    /// `Shared::back_to_sender` style push helpers in the reference
    /// socket-actor pattern; errors are ignored here exactly as the teacher
    /// ignores `SplitSink::send` failures at the point of push, since a
    /// broken outbox is discovered and cleaned up by the connection task's
    /// own read loop, not by the handler doing the pushing.
    pub fn push(&self, message: &str) {
        let _ = self.outbox.send(message.to_string());
    }
}
