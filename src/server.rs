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

//! The `Server` aggregate: the single owner of all mutable state, per
//! spec.md §9 "Global mutable state" ("Replace [process-wide list heads] with
//! a single `Server` aggregate that owns Registry, AccountStore handle,
//! counters; pass it explicitly to handlers").
//!
//! Wrapped in one `Arc<tokio::sync::Mutex<Server>>`, generalizing the
//! teacher's `Arc<Mutex<ServerState>>` from a single lobby+match to many
//! named games; every handler call holds this one lock for its full
//! duration, which is the "coarse-grained locking" serialization strategy
//! spec.md §5 explicitly sanctions as an alternative to a single
//! command-processing actor task.

use tokio::sync::mpsc::UnboundedSender;

use crate::account::AccountStore;
use crate::model::ConnId;
use crate::registry::Registry;

/// Connections are refused once `active_connections` reaches this, per
/// spec.md §4.1 "Admission control".
pub const MAX_CONNECTIONS: usize = 10;

pub struct Server {
    pub registry: Registry,
    pub accounts: AccountStore,
    next_conn_id: ConnId,
    /// Total connections ever admitted past the cap; bookkeeping only, per
    /// spec.md's "Admission control" ("Counters track total-accepted and
    /// currently-active").
    pub total_accepted: u64,
    pub max_connections: usize,
}

impl Server {
    pub fn new(accounts: AccountStore) -> Self {
        Server {
            registry: Registry::new(),
            accounts,
            next_conn_id: 0,
            total_accepted: 0,
            max_connections: MAX_CONNECTIONS,
        }
    }

    /// Registers a newly-accepted connection if under the cap, per spec.md
    /// §4.1. Returns `None` (and does not register the connection) if the
    /// active-connection count is already at `max_connections`.
    pub fn try_accept(&mut self, outbox: UnboundedSender<String>) -> Option<ConnId> {
        if self.registry.active_player_count() >= self.max_connections {
            return None;
        }
        let conn_id = self.next_conn_id;
        self.next_conn_id += 1;
        self.registry.add_player(conn_id, outbox);
        self.total_accepted += 1;
        Some(conn_id)
    }

    pub fn active_connections(&self) -> usize {
        self.registry.active_player_count()
    }
}
