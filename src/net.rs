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

//! The ConnectionLoop: per-connection task, per spec.md §4.1.
//!
//! Grounded on the `Peer`/`process` pair in
//! `examples/other_examples/...sidestacker...server-src-lib.rs.rs`: a
//! `Framed<TcpStream, LinesCodec>` for newline-delimited JSON, an
//! `mpsc::unbounded_channel` per connection for messages pushed from other
//! handlers, and a `tokio::select!` between the two streams. Generalized
//! here from that file's two-peer special case to an arbitrary number of
//! concurrently connected sockets, all serialized through one
//! `Arc<tokio::sync::Mutex<Server>>`, per spec.md §5.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};
use tracing::{debug, info, warn};

use crate::handlers::{disconnect_player, dispatch};
use crate::protocol::{Request, UnknownCommand, Welcome, CAPACITY_REFUSAL_SENTINEL};
use crate::server::Server;

/// Longest request line accepted, per spec.md §4.1 "Oversize or malformed
/// frames yield an `unknown_command` response and do not close the
/// connection." Comfortably above the largest response this server ever
/// emits (a full board state), so legitimate traffic never hits it.
const MAX_LINE_LENGTH: usize = 65536;

/// Accepts one connection, per spec.md §4.1 "Admission control" and
/// "Connection lifecycle". Refuses the connection with
/// [`CAPACITY_REFUSAL_SENTINEL`] if the server is already at capacity,
/// otherwise runs the ConnectionLoop until the peer disconnects, an
/// explicit `disconnect` verb is seen, or the transport errors out.
pub async fn handle_connection(state: Arc<Mutex<Server>>, stream: TcpStream) {
    let mut lines = Framed::new(stream, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));

    let (outbox_tx, mut outbox_rx) = mpsc::unbounded_channel::<String>();
    let conn_id = {
        let mut server = state.lock().await;
        server.try_accept(outbox_tx)
    };

    let Some(conn_id) = conn_id else {
        let _ = lines.send(CAPACITY_REFUSAL_SENTINEL).await;
        return;
    };

    debug!(conn_id, "connection accepted");
    if lines
        .send(serde_json::to_string(&Welcome::default()).expect("Welcome always serializes"))
        .await
        .is_err()
    {
        let mut server = state.lock().await;
        disconnect_player(&mut server, conn_id);
        return;
    }

    loop {
        tokio::select! {
            // A handler acting on behalf of another connection pushed a
            // message for this player (opponent's move, game_over, ...).
            Some(message) = outbox_rx.recv() => {
                if lines.send(message).await.is_err() {
                    break;
                }
            }

            result = lines.next() => match result {
                Some(Ok(line)) => {
                    let request: Result<Request, _> = serde_json::from_str(&line);
                    let response = match request {
                        Ok(request) => {
                            let mut server = state.lock().await;
                            let (response, should_close) = dispatch(&mut server, conn_id, request);
                            if should_close {
                                let _ = lines.send(response).await;
                                break;
                            }
                            response
                        }
                        Err(_) => serde_json::to_string(&UnknownCommand::default())
                            .expect("UnknownCommand always serializes"),
                    };
                    if lines.send(response).await.is_err() {
                        break;
                    }
                }
                // A malformed frame (bad UTF-8) or an overlong line is a
                // client protocol error, not a transport failure: reply
                // `unknown_command` and keep the connection open, per
                // spec.md §4.1. Only an underlying IO error closes it.
                Some(Err(LinesCodecError::Io(e))) => {
                    warn!(conn_id, error = %e, "connection error");
                    break;
                }
                Some(Err(e)) => {
                    warn!(conn_id, error = %e, "malformed frame");
                    let response = serde_json::to_string(&UnknownCommand::default())
                        .expect("UnknownCommand always serializes");
                    if lines.send(response).await.is_err() {
                        break;
                    }
                }
                None => break,
            }
        }
    }

    let mut server = state.lock().await;
    disconnect_player(&mut server, conn_id);
    info!(conn_id, "connection closed");
}
