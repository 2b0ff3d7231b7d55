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

//! Salted password hashing, per spec.md §4.5.
//!
//! Wraps the `bcrypt` crate: its stored form (`$2b$<cost>$<22-char salt><31-char
//! hash>`) already carries the algorithm-tag-plus-delimiter shape the spec
//! describes (the reference implementation uses a `$5$` SHA-256-crypt tag;
//! bcrypt's `$2b$` tag plays the same role). `bcrypt::verify` extracts the
//! salt from the stored form internally and re-hashes for comparison, so this
//! module is a thin pass-through rather than reimplementing that extraction.

use crate::error::PasswordError;

/// Work factor passed to bcrypt. Higher costs are slower and more resistant
/// to brute force; 12 is bcrypt's own default and adequate for an
/// interactive login path.
const COST: u32 = 12;

/// Generates a salted hash for `plaintext`.
pub fn hash(plaintext: &str) -> Result<String, PasswordError> {
    Ok(bcrypt::hash(plaintext, COST)?)
}

/// Verifies `plaintext` against a previously produced `stored_form`.
pub fn verify(plaintext: &str, stored_form: &str) -> Result<bool, PasswordError> {
    Ok(bcrypt::verify(plaintext, stored_form)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_its_own_stored_form() {
        let stored = hash("correct horse battery staple").unwrap();
        assert!(verify("correct horse battery staple", &stored).unwrap());
    }

    #[test]
    fn rejects_wrong_password() {
        let stored = hash("correct horse battery staple").unwrap();
        assert!(!verify("wrong password", &stored).unwrap());
    }

    #[test]
    fn distinct_hashes_for_same_plaintext() {
        // distinct random salts per call
        let a = hash("hunter2").unwrap();
        let b = hash("hunter2").unwrap();
        assert_ne!(a, b);
        assert!(verify("hunter2", &a).unwrap());
        assert!(verify("hunter2", &b).unwrap());
    }
}
