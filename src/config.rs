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

//! Command-line configuration, generalizing the teacher's `Args` (`clap::Parser`
//! with a `#[clap(flatten)]` options group) from a single lobby-size flag to
//! the port/database/connection-cap knobs this server needs.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(about = "Authoritative session coordinator for a multi-player Pente game service")]
pub struct Config {
    /// TCP port to listen on.
    #[arg(short, long, env = "PENTE_PORT", default_value_t = 55555)]
    pub port: u16,

    /// Path to the SQLite database file holding player accounts.
    #[arg(long, env = "PENTE_DB_PATH", default_value = "pente.db")]
    pub db_path: String,

    /// Maximum number of simultaneously connected sockets, per spec.md §4.1
    /// "Admission control".
    #[arg(long, env = "PENTE_MAX_CONNECTIONS", default_value_t = crate::server::MAX_CONNECTIONS)]
    pub max_connections: usize,
}
