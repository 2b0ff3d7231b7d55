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

//! Elo-shaped score delta, per spec.md §4.3.1.

/// The maximum score points exchanged on a single match, before scaling by
/// rating gap.
const K_FACTOR: f64 = 30.0;

/// `round( 30 / (1 + 10^((S_w - S_p)/400)) )`, per spec.md §4.3.1. Applied as
/// `+delta` to the winner's score and `-delta` to the loser's. Scores are
/// signed and not floored at zero, per the spec's explicit design choice.
pub fn delta(winner_score: i64, loser_score: i64) -> i64 {
    let exponent = (winner_score - loser_score) as f64 / 400.0;
    let expected_loss_share = 1.0 / (1.0 + 10f64.powf(exponent));
    (K_FACTOR * expected_loss_share).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_scores_split_half_the_k_factor() {
        assert_eq!(delta(1000, 1000), 15);
    }

    #[test]
    fn stronger_winner_gains_less() {
        let underdog_win = delta(1000, 1200);
        let favorite_win = delta(1200, 1000);
        assert!(underdog_win > favorite_win);
    }

    #[test]
    fn delta_is_never_negative_for_a_winner() {
        assert!(delta(0, 2000) >= 0);
        assert!(delta(2000, 0) >= 0);
    }
}
