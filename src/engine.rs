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

//! Point engine.
//!
//! The [`PointEngine`] is the central component that validates requests,
//! serializes mutations per user and keeps each user's balance and ledger in
//! step.
//!
//! # Operations
//!
//! - **Query**: Reads the current balance without locking.
//! - **History**: Reads the user's ledger entries in append order.
//! - **Charge**: Increases the balance, up to [`MAX_POINT`].
//! - **Use**: Decreases the balance, never below zero.
//!
//! # Thread Safety
//!
//! Charge and use run their read-check-append-write sequence inside the
//! user's lock from [`KeyedLock`], so concurrent mutations of one user form a
//! single total order while different users proceed in parallel.

use crate::balance::{BalanceStore, UserPoint};
use crate::base::{MAX_POINT, UserId};
use crate::clock::{Clock, SystemClock};
use crate::keyed_lock::KeyedLock;
use crate::ledger::{LedgerEntry, LedgerStore};
use crate::transaction::TransactionKind;
use crate::PointError;
use tracing::debug;

/// Point engine that manages user balances and their ledger.
///
/// # Invariants
///
/// - Every stored balance is within `0..=MAX_POINT`.
/// - Every accepted mutation appends exactly one ledger entry whose `point`
///   equals the balance written by that mutation.
/// - Rejected requests write nothing.
pub struct PointEngine<C = SystemClock> {
    /// Current balance per user.
    balances: BalanceStore,
    /// Balance changes per user.
    ledger: LedgerStore,
    /// One lock per user, guarding both stores for that user.
    locks: KeyedLock<UserId>,
    /// Source of `updated_at` and ledger timestamps.
    clock: C,
}

impl PointEngine {
    /// Creates an engine with no balances, stamped by the system clock.
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl<C: Clock> PointEngine<C> {
    /// Creates an engine that takes timestamps from `clock`.
    pub fn with_clock(clock: C) -> Self {
        PointEngine {
            balances: BalanceStore::new(),
            ledger: LedgerStore::new(),
            locks: KeyedLock::new(),
            clock,
        }
    }

    /// Returns the current balance of a user.
    ///
    /// Users that were never charged have a balance of zero. The read does not
    /// wait for in-flight mutations of the same user.
    ///
    /// # Errors
    ///
    /// - [`PointError::InvalidUserId`] - `user_id` is not positive.
    pub fn query(&self, user_id: UserId) -> Result<UserPoint, PointError> {
        if !user_id.is_valid() {
            return Err(PointError::InvalidUserId);
        }
        Ok(self.balances.get(user_id))
    }

    /// Returns the ledger entries of a user in the order they were recorded.
    ///
    /// Unlike the other operations, the id is not validated: an unknown or
    /// non-positive id simply has an empty history.
    pub fn history(&self, user_id: UserId) -> Vec<LedgerEntry> {
        self.ledger.list_by_user(user_id)
    }

    /// Adds `amount` points to a user's balance.
    ///
    /// # Errors
    ///
    /// - [`PointError::InvalidUserId`] - `user_id` is not positive.
    /// - [`PointError::InvalidChargeAmount`] - `amount` is not positive.
    /// - [`PointError::ExceedingCharge`] - The balance would exceed [`MAX_POINT`].
    pub fn charge(&self, user_id: UserId, amount: i64) -> Result<UserPoint, PointError> {
        if !user_id.is_valid() {
            return Err(PointError::InvalidUserId);
        }
        if amount <= 0 {
            return Err(PointError::InvalidChargeAmount);
        }

        self.apply(user_id, TransactionKind::Charge, |current| {
            current
                .checked_add(amount)
                .filter(|updated| *updated <= MAX_POINT)
                .ok_or(PointError::ExceedingCharge)
        })
    }

    /// Subtracts `amount` points from a user's balance.
    ///
    /// # Errors
    ///
    /// - [`PointError::InvalidUserId`] - `user_id` is not positive.
    /// - [`PointError::InvalidUseAmount`] - `amount` is not positive.
    /// - [`PointError::ExceedingUse`] - The balance would drop below zero.
    pub fn use_points(&self, user_id: UserId, amount: i64) -> Result<UserPoint, PointError> {
        if !user_id.is_valid() {
            return Err(PointError::InvalidUserId);
        }
        if amount <= 0 {
            return Err(PointError::InvalidUseAmount);
        }

        self.apply(user_id, TransactionKind::Use, |current| {
            current
                .checked_sub(amount)
                .filter(|updated| *updated >= 0)
                .ok_or(PointError::ExceedingUse)
        })
    }

    /// Returns a snapshot of every stored balance, in no particular order.
    pub fn balances(&self) -> impl Iterator<Item = UserPoint> + '_ {
        self.balances.iter()
    }

    /// Runs one mutation inside the user's lock.
    ///
    /// `policy` maps the current balance to the new one or rejects. The ledger
    /// entry is appended before the balance is overwritten, and both happen
    /// before the lock is released.
    fn apply<F>(
        &self,
        user_id: UserId,
        kind: TransactionKind,
        policy: F,
    ) -> Result<UserPoint, PointError>
    where
        F: FnOnce(i64) -> Result<i64, PointError>,
    {
        self.locks.with_lock(&user_id, || {
            let current = self.balances.get(user_id);

            let updated = policy(current.point).inspect_err(|error| {
                debug!(
                    user = %user_id,
                    %kind,
                    point = current.point,
                    code = error.code(),
                    "rejected: {error}"
                );
            })?;

            let now = self.clock.now_millis();
            let entry = self.ledger.append(user_id, updated, kind, now);
            let user_point = self.balances.set(user_id, updated, now);

            debug!(
                user = %user_id,
                %kind,
                point = updated,
                entry = %entry.id,
                "applied"
            );
            Ok(user_point)
        })
    }
}

impl Default for PointEngine {
    fn default() -> Self {
        Self::new()
    }
}
