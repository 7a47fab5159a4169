// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Core identifier types and balance bounds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound of a user's point balance.
pub const MAX_POINT: i64 = 10_000_000;

/// Unique identifier for a user.
///
/// Wraps an `i64` so that non-positive ids coming from a transport can be
/// represented and rejected by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl UserId {
    /// Returns `true` for strictly positive ids.
    pub fn is_valid(&self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a ledger entry.
///
/// Assigned by the ledger on append, starting at 1 and strictly increasing
/// across all users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct EntryId(pub u64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_validity() {
        assert!(UserId(1).is_valid());
        assert!(UserId(i64::MAX).is_valid());
        assert!(!UserId(0).is_valid());
        assert!(!UserId(-1).is_valid());
    }

    #[test]
    fn ids_display_as_plain_numbers() {
        assert_eq!(UserId(42).to_string(), "42");
        assert_eq!(EntryId(7).to_string(), "7");
    }
}
