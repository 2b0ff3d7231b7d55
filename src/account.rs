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

//! Persistent player identities and cumulative statistics, per spec.md §4.4
//! and the schema in §6.
//!
//! Grounded on the `Shared::db_connection: rusqlite::Connection` field and
//! its `init_db`/`Drop` persistence calls in
//! `examples/other_examples/...sidestacker...server-src-lib.rs.rs`: a single
//! synchronous `rusqlite::Connection`, owned by the same aggregate that owns
//! the Registry and accessed only while holding that aggregate's lock, which
//! is what makes "concurrent access from the single-threaded loop means no
//! in-process race" (spec.md §4.4 "Transactionality") true here. All
//! statements are parameterized (`rusqlite::params!`) rather than
//! string-built, per the same section's injection-avoidance requirement.

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::AccountError;
use crate::model::PlayerStats;
use crate::password;

/// One persisted player identity plus cumulative stats, per spec.md §3
/// "AccountRecord" and the `Players` table in spec.md §6.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRecord {
    pub id: i64,
    pub name: String,
    pub password_hash: String,
    pub wins: u32,
    pub losses: u32,
    pub forfeits: u32,
    pub games_played: u32,
    pub score: i64,
}

impl AccountRecord {
    /// The wire-shaped stats view of this record, per spec.md §6 "Player
    /// stats payload".
    pub fn stats(&self) -> PlayerStats {
        PlayerStats {
            score: self.score,
            wins: self.wins,
            losses: self.losses,
            forfeits: self.forfeits,
            games_played: self.games_played,
        }
    }
}

/// Which column `lookup_by` searches, per spec.md §4.4.
pub enum Column<'a> {
    Id(i64),
    Name(&'a str),
}

/// The relational store of player accounts, per spec.md §4.4.
pub struct AccountStore {
    conn: Connection,
}

impl AccountStore {
    /// Opens (creating if absent) the database at `path` and ensures the
    /// `Players` table from spec.md §6 exists.
    pub fn open(path: &str) -> Result<Self, AccountError> {
        let conn = Connection::open(path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS Players (
                player_id     INTEGER PRIMARY KEY,
                username      TEXT NOT NULL UNIQUE,
                password      TEXT NOT NULL,
                forfeits      INTEGER NOT NULL DEFAULT 0,
                wins          INTEGER NOT NULL DEFAULT 0,
                losses        INTEGER NOT NULL DEFAULT 0,
                played_games  INTEGER NOT NULL DEFAULT 0,
                score         INTEGER NOT NULL DEFAULT 0
            )",
            [],
        )?;
        Ok(AccountStore { conn })
    }

    /// Opens an in-memory database, for tests.
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, AccountError> {
        Self::open(":memory:")
    }

    /// Creates a new account with zeroed stats, per spec.md §4.4 `insert`.
    /// The plaintext password is hashed before it ever reaches a SQL
    /// statement; it is never persisted.
    pub fn create(&self, name: &str, plaintext_password: &str) -> Result<AccountRecord, AccountError> {
        if self.lookup_by(Column::Name(name))?.is_some() {
            return Err(AccountError::DuplicateName(name.to_string()));
        }
        let hash = password::hash(plaintext_password)?;

        self.conn.execute(
            "INSERT INTO Players (username, password) VALUES (?1, ?2)",
            params![name, hash],
        )?;
        let id = self.conn.last_insert_rowid();

        Ok(AccountRecord {
            id,
            name: name.to_string(),
            password_hash: hash,
            wins: 0,
            losses: 0,
            forfeits: 0,
            games_played: 0,
            score: 0,
        })
    }

    /// Finds an account by id or by name, per spec.md §4.4 `lookup_by`.
    pub fn lookup_by(&self, column: Column<'_>) -> Result<Option<AccountRecord>, AccountError> {
        let mut query_by_id = self.conn.prepare(
            "SELECT player_id, username, password, wins, losses, forfeits, played_games, score
             FROM Players WHERE player_id = ?1",
        )?;
        let mut query_by_name = self.conn.prepare(
            "SELECT player_id, username, password, wins, losses, forfeits, played_games, score
             FROM Players WHERE username = ?1",
        )?;

        let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<AccountRecord> {
            Ok(AccountRecord {
                id: row.get(0)?,
                name: row.get(1)?,
                password_hash: row.get(2)?,
                wins: row.get(3)?,
                losses: row.get(4)?,
                forfeits: row.get(5)?,
                games_played: row.get(6)?,
                score: row.get(7)?,
            })
        };

        let record = match column {
            Column::Id(id) => query_by_id.query_row(params![id], map_row).optional()?,
            Column::Name(name) => query_by_name.query_row(params![name], map_row).optional()?,
        };
        Ok(record)
    }

    /// Finds an account by name and verifies `plaintext_password` against
    /// its stored hash, for the `auth` verb.
    pub fn authenticate(
        &self,
        name: &str,
        plaintext_password: &str,
    ) -> Result<Option<AccountRecord>, AccountError> {
        let Some(record) = self.lookup_by(Column::Name(name))? else {
            return Ok(None);
        };
        let ok = password::verify(plaintext_password, &record.password_hash)?;
        Ok(if ok { Some(record) } else { None })
    }

    /// Persists `record`'s mutable columns, per spec.md §4.4 `update_stats`.
    /// Invariant: `games_played == wins + losses` (forfeits counted within
    /// losses), per spec.md §3.
    pub fn update_stats(&self, record: &AccountRecord) -> Result<(), AccountError> {
        debug_assert_eq!(record.games_played, record.wins + record.losses);
        self.conn.execute(
            "UPDATE Players SET wins = ?1, losses = ?2, forfeits = ?3, played_games = ?4, score = ?5
             WHERE player_id = ?6",
            params![
                record.wins,
                record.losses,
                record.forfeits,
                record.games_played,
                record.score,
                record.id
            ],
        )?;
        Ok(())
    }

    /// Deletes an account, per spec.md §4.4 ("delete exists as an admin
    /// operation"). Not wired to any dispatched verb; spec.md §4.1's verb
    /// list is exhaustive and does not include one.
    pub fn delete_by_id(&self, id: i64) -> Result<(), AccountError> {
        self.conn.execute("DELETE FROM Players WHERE player_id = ?1", params![id])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_authenticate_round_trips() {
        let store = AccountStore::open_in_memory().unwrap();
        let created = store.create("alice", "pw1").unwrap();
        assert_eq!(created.score, 0);
        assert_eq!(created.wins, 0);

        let authed = store.authenticate("alice", "pw1").unwrap().unwrap();
        assert_eq!(authed.id, created.id);
        assert_eq!(authed.stats(), created.stats());
    }

    #[test]
    fn wrong_password_does_not_authenticate() {
        let store = AccountStore::open_in_memory().unwrap();
        store.create("alice", "pw1").unwrap();
        assert!(store.authenticate("alice", "wrong").unwrap().is_none());
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let store = AccountStore::open_in_memory().unwrap();
        store.create("alice", "pw1").unwrap();
        assert!(matches!(
            store.create("alice", "pw2"),
            Err(AccountError::DuplicateName(_))
        ));
    }

    #[test]
    fn update_stats_persists_and_games_played_invariant_holds() {
        let store = AccountStore::open_in_memory().unwrap();
        let mut record = store.create("alice", "pw1").unwrap();
        record.wins = 1;
        record.games_played = 1;
        record.score = 15;
        store.update_stats(&record).unwrap();

        let reloaded = store.lookup_by(Column::Id(record.id)).unwrap().unwrap();
        assert_eq!(reloaded.wins, 1);
        assert_eq!(reloaded.score, 15);
        assert_eq!(reloaded.games_played, reloaded.wins + reloaded.losses);
    }

    #[test]
    fn delete_by_id_removes_the_account() {
        let store = AccountStore::open_in_memory().unwrap();
        let record = store.create("alice", "pw1").unwrap();
        store.delete_by_id(record.id).unwrap();
        assert!(store.lookup_by(Column::Name("alice")).unwrap().is_none());
    }
}
