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

//! Typed errors for each component, per the component design in the spec.

use thiserror::Error;

/// Errors raised by [`crate::account::AccountStore`].
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("a player named {0:?} already exists")]
    DuplicateName(String),
    #[error("no account found")]
    NotFound,
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("password hashing error: {0}")]
    Password(#[from] PasswordError),
}

/// Errors raised by [`crate::password::PasswordHasher`].
#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

/// Errors raised by [`crate::registry::Registry`] when the caller's request
/// violates a Registry contract from spec.md §4.2.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("a game named {0:?} already exists")]
    DuplicateGame(String),
    #[error("no game named {0:?} exists")]
    NoSuchGame(String),
    #[error("game {0:?} is full")]
    GameFull(String),
    #[error("game {0:?} is already ongoing")]
    GameOngoing(String),
    #[error("no such player")]
    NoSuchPlayer,
}

/// Errors raised while adjudicating a move in [`crate::model::game::GameSession`].
#[derive(Debug, Error)]
pub enum MoveError {
    #[error("coordinates out of range")]
    OutOfRange,
    #[error("target cell is not empty")]
    CellOccupied,
    #[error("game is not ongoing")]
    NotOngoing,
    #[error("it is not the caller's turn")]
    NotYourTurn,
    #[error("caller is not a participant of this session")]
    NotAParticipant,
}
