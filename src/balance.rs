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

//! Current point balance per user.
//!
//! # Example
//!
//! ```
//! use point_ledger_rs::{BalanceStore, UserId};
//!
//! let store = BalanceStore::new();
//! assert_eq!(store.get(UserId(1)).point, 0);
//!
//! store.set(UserId(1), 500, 1_700_000_000_000);
//! assert_eq!(store.get(UserId(1)).point, 500);
//! ```

use crate::base::UserId;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// A user's balance at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPoint {
    pub id: UserId,
    pub point: i64,
    /// Milliseconds since the Unix epoch; `0` for a user that was never written.
    pub updated_at: i64,
}

impl UserPoint {
    /// Zero balance for a user that has never been charged.
    pub fn empty(id: UserId) -> Self {
        Self {
            id,
            point: 0,
            updated_at: 0,
        }
    }
}

/// Concurrent map of user balances.
///
/// The store performs no validation and no per-user serialization; callers
/// that read-modify-write a balance must hold that user's lock. Accesses to
/// different users only contend when they hash to the same shard, and never
/// for longer than a single map operation.
#[derive(Debug, Default)]
pub struct BalanceStore {
    balances: DashMap<UserId, UserPoint>,
}

impl BalanceStore {
    pub fn new() -> Self {
        Self {
            balances: DashMap::new(),
        }
    }

    /// Returns the stored balance, or [`UserPoint::empty`] if none exists.
    pub fn get(&self, user_id: UserId) -> UserPoint {
        self.balances
            .get(&user_id)
            .map(|entry| *entry.value())
            .unwrap_or_else(|| UserPoint::empty(user_id))
    }

    /// Overwrites the balance unconditionally and returns the stored value.
    pub fn set(&self, user_id: UserId, point: i64, updated_at: i64) -> UserPoint {
        let user_point = UserPoint {
            id: user_id,
            point,
            updated_at,
        };
        self.balances.insert(user_id, user_point);
        user_point
    }

    /// Iterates over a snapshot of every stored balance, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = UserPoint> + '_ {
        self.balances.iter().map(|entry| *entry.value())
    }

    pub fn len(&self) -> usize {
        self.balances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }
}
