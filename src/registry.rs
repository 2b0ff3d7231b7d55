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

//! Process-wide directories of connected players and live game sessions,
//! per spec.md §4.2.
//!
//! Generalizes the teacher's single `connections: HashMap<String,
//! SplitSink<WebSocket, Message>>` (one map, one game) into two maps (many
//! named games, many players, most of them not yet authenticated) while
//! keeping the same "the map IS the registry, no extra indirection" shape.

use std::collections::HashMap;

use tokio::sync::mpsc::UnboundedSender;

use crate::error::RegistryError;
use crate::model::game::Participant;
use crate::model::{ConnId, GameSession, Player};

/// Owns the set of connected Players and the set of live GameSessions, per
/// spec.md §4.2.
#[derive(Default)]
pub struct Registry {
    players: HashMap<ConnId, Player>,
    /// Index from display name to conn id, maintained only for
    /// authenticated players (names are unique only among those, per
    /// spec.md §3 invariants).
    names: HashMap<String, ConnId>,
    games: HashMap<String, GameSession>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    /// Registers a freshly-accepted, unauthenticated connection.
    pub fn add_player(&mut self, conn_id: ConnId, outbox: UnboundedSender<String>) {
        self.players.insert(conn_id, Player::new(conn_id, outbox));
    }

    pub fn player(&self, conn_id: ConnId) -> Option<&Player> {
        self.players.get(&conn_id)
    }

    pub fn player_mut(&mut self, conn_id: ConnId) -> Option<&mut Player> {
        self.players.get_mut(&conn_id)
    }

    pub fn find_player_by_name(&self, name: &str) -> Option<&Player> {
        self.names.get(name).and_then(|id| self.players.get(id))
    }

    pub fn name_is_taken(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Marks a connection authenticated under `name`, per spec.md §3
    /// invariant "no two Players share a name while both authenticated".
    /// Caller must have already checked `name_is_taken`.
    pub fn authenticate(&mut self, conn_id: ConnId, account_id: i64, name: String) {
        self.names.insert(name.clone(), conn_id);
        if let Some(player) = self.players.get_mut(&conn_id) {
            player.account_id = Some(account_id);
            player.auth_state = crate::model::AuthState::Authenticated;
            player.name = Some(name);
        }
    }

    /// Removes a connection entirely, per spec.md §4.1 "Connection
    /// termination". Does not touch any GameSession the player was part of;
    /// callers resolve that first (forfeit or destroy) using
    /// `find_game_by_participant`, since what happens to the session depends
    /// on its status, not on the Registry.
    pub fn remove_player(&mut self, conn_id: ConnId) -> Option<Player> {
        let player = self.players.remove(&conn_id)?;
        if let Some(name) = &player.name {
            self.names.remove(name);
        }
        Some(player)
    }

    /// Creates a new `waiting` session, per spec.md §4.2 ("Adding a
    /// GameSession fails if a live session with the same name exists").
    pub fn create_game(&mut self, name: String, host: Participant) -> Result<(), RegistryError> {
        if self.games.contains_key(&name) {
            return Err(RegistryError::DuplicateGame(name));
        }
        self.games.insert(name.clone(), GameSession::new(name, host));
        Ok(())
    }

    pub fn game(&self, name: &str) -> Option<&GameSession> {
        self.games.get(name)
    }

    pub fn game_mut(&mut self, name: &str) -> Option<&mut GameSession> {
        self.games.get_mut(name)
    }

    pub fn find_game_by_participant(&self, conn_id: ConnId) -> Option<&GameSession> {
        self.games.values().find(|g| g.is_participant(conn_id))
    }

    pub fn find_game_by_participant_mut(&mut self, conn_id: ConnId) -> Option<&mut GameSession> {
        self.games.values_mut().find(|g| g.is_participant(conn_id))
    }

    /// Fills the first empty slot of `game_name` with `joiner`, per spec.md
    /// §4.2 ("host before joiner"; "fails if both slots are occupied or if
    /// status is `ongoing`").
    pub fn join_game(&mut self, game_name: &str, joiner: Participant) -> Result<(), RegistryError> {
        let game = self
            .games
            .get_mut(game_name)
            .ok_or_else(|| RegistryError::NoSuchGame(game_name.to_string()))?;
        if game.status != crate::model::Status::Waiting {
            return Err(RegistryError::GameOngoing(game_name.to_string()));
        }
        if game.joiner.is_some() {
            return Err(RegistryError::GameFull(game_name.to_string()));
        }
        game.seat_joiner(joiner);
        Ok(())
    }

    /// Destroys a session, clearing `current_game` on both participants, per
    /// spec.md §4.2 ("Removing a GameSession clears `current_game` in both
    /// participants (they remain connected and authenticated)").
    pub fn remove_game(&mut self, name: &str) -> Option<GameSession> {
        let game = self.games.remove(name)?;
        if let Some(p) = self.players.get_mut(&game.host.conn_id) {
            p.current_game = None;
        }
        if let Some(joiner) = &game.joiner {
            if let Some(p) = self.players.get_mut(&joiner.conn_id) {
                p.current_game = None;
            }
        }
        Some(game)
    }

    /// Lists live sessions, for `get_lobby`. No ordering guarantee, per
    /// spec.md §4.2.
    pub fn list_games(&self) -> impl Iterator<Item = &GameSession> {
        self.games.values()
    }

    pub fn active_player_count(&self) -> usize {
        self.players.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn outbox() -> UnboundedSender<String> {
        mpsc::unbounded_channel().0
    }

    #[test]
    fn duplicate_game_name_is_rejected() {
        let mut registry = Registry::new();
        registry.add_player(1, outbox());
        registry.add_player(2, outbox());
        registry
            .create_game("duel1".into(), Participant { conn_id: 1, name: "alice".into() })
            .unwrap();
        let err = registry.create_game(
            "duel1".into(),
            Participant { conn_id: 2, name: "charlie".into() },
        );
        assert!(matches!(err, Err(RegistryError::DuplicateGame(_))));
    }

    #[test]
    fn join_fills_joiner_slot_and_rejects_when_full() {
        let mut registry = Registry::new();
        registry.add_player(1, outbox());
        registry.add_player(2, outbox());
        registry.add_player(3, outbox());
        registry
            .create_game("duel1".into(), Participant { conn_id: 1, name: "alice".into() })
            .unwrap();
        registry
            .join_game("duel1", Participant { conn_id: 2, name: "bob".into() })
            .unwrap();
        let err = registry.join_game("duel1", Participant { conn_id: 3, name: "carl".into() });
        assert!(matches!(err, Err(RegistryError::GameFull(_))));
    }

    #[test]
    fn removing_a_game_clears_current_game_on_both_participants() {
        let mut registry = Registry::new();
        registry.add_player(1, outbox());
        registry.add_player(2, outbox());
        registry
            .create_game("duel1".into(), Participant { conn_id: 1, name: "alice".into() })
            .unwrap();
        registry
            .join_game("duel1", Participant { conn_id: 2, name: "bob".into() })
            .unwrap();
        registry.player_mut(1).unwrap().current_game = Some("duel1".into());
        registry.player_mut(2).unwrap().current_game = Some("duel1".into());

        registry.remove_game("duel1");

        assert_eq!(registry.player(1).unwrap().current_game, None);
        assert_eq!(registry.player(2).unwrap().current_game, None);
        assert!(registry.game("duel1").is_none());
    }
}
