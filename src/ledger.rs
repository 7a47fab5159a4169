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

//! Append-only ledger of balance changes.
//!
//! Entries are grouped per user in insertion order. Entry ids come from a
//! single atomic counter, so they are unique and strictly increasing across
//! all users.

use crate::base::{EntryId, UserId};
use crate::transaction::TransactionKind;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A single balance change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub user_id: UserId,
    /// Balance after the change was applied.
    pub point: i64,
    pub kind: TransactionKind,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

/// Thread-safe, append-only ledger.
#[derive(Debug)]
pub struct LedgerStore {
    /// Entries per user, in append order.
    entries: DashMap<UserId, Vec<LedgerEntry>>,

    /// Next id to hand out.
    next_id: AtomicU64,
}

impl LedgerStore {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Records a new entry and returns it.
    ///
    /// The id is drawn while the user's slot is held, so a user's entries are
    /// always stored in id order even without external locking.
    pub fn append(
        &self,
        user_id: UserId,
        point: i64,
        kind: TransactionKind,
        timestamp: i64,
    ) -> LedgerEntry {
        let mut entries = self.entries.entry(user_id).or_default();
        let entry = LedgerEntry {
            id: EntryId(self.next_id.fetch_add(1, Ordering::SeqCst)),
            user_id,
            point,
            kind,
            timestamp,
        };
        entries.push(entry);
        entry
    }

    /// Returns all entries of `user_id` in append order.
    pub fn list_by_user(&self, user_id: UserId) -> Vec<LedgerEntry> {
        self.entries
            .get(&user_id)
            .map(|entries| entries.value().clone())
            .unwrap_or_default()
    }

    /// Total number of entries across all users.
    pub fn len(&self) -> usize {
        self.entries.iter().map(|entries| entries.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for LedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn unknown_user_has_empty_history() {
        let ledger = LedgerStore::new();
        assert!(ledger.list_by_user(UserId(1)).is_empty());
        assert!(ledger.list_by_user(UserId(-1)).is_empty());
        assert!(ledger.is_empty());
    }

    #[test]
    fn append_assigns_increasing_ids_from_one() {
        let ledger = LedgerStore::new();
        let first = ledger.append(UserId(1), 100, TransactionKind::Charge, 10);
        let second = ledger.append(UserId(2), 50, TransactionKind::Charge, 11);
        let third = ledger.append(UserId(1), 70, TransactionKind::Use, 12);

        assert_eq!(first.id, EntryId(1));
        assert_eq!(second.id, EntryId(2));
        assert_eq!(third.id, EntryId(3));
        assert_eq!(ledger.len(), 3);
    }

    #[test]
    fn list_preserves_insertion_order_per_user() {
        let ledger = LedgerStore::new();
        ledger.append(UserId(1), 100, TransactionKind::Charge, 1);
        ledger.append(UserId(2), 5, TransactionKind::Charge, 2);
        ledger.append(UserId(1), 60, TransactionKind::Use, 3);

        let history = ledger.list_by_user(UserId(1));
        let points: Vec<i64> = history.iter().map(|entry| entry.point).collect();
        assert_eq!(points, vec![100, 60]);
        assert_eq!(history[1].kind, TransactionKind::Use);
        assert_eq!(history[1].timestamp, 3);
    }

    #[test]
    fn concurrent_appends_get_unique_ids() {
        let ledger = Arc::new(LedgerStore::new());

        let handles: Vec<_> = (1..=8)
            .map(|user| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || {
                    for i in 0..100 {
                        ledger.append(UserId(user), i, TransactionKind::Charge, 0);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let mut ids = Vec::new();
        for user in 1..=8 {
            let history = ledger.list_by_user(UserId(user));
            assert_eq!(history.len(), 100);
            // Per-user order follows id order.
            assert!(history.windows(2).all(|pair| pair[0].id < pair[1].id));
            ids.extend(history.iter().map(|entry| entry.id.0));
        }
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 800);
        assert_eq!(ids.first(), Some(&1));
        assert_eq!(ids.last(), Some(&800));
    }
}
