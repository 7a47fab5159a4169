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

//! # Point Ledger
//!
//! This library keeps a point balance per user together with an append-only
//! ledger of every change. Balances are increased by charges and decreased by
//! uses, within `0..=10_000_000`.
//!
//! ## Core Components
//!
//! - [`PointEngine`]: Validates requests and applies charges and uses per user
//! - [`BalanceStore`]: Current balance per user
//! - [`LedgerStore`]: Append-only history of balance changes
//! - [`KeyedLock`]: Lazily created lock per user
//! - [`PointError`]: Rejections returned by the engine
//!
//! ## Example
//!
//! ```
//! use point_ledger_rs::{PointEngine, PointError, TransactionKind, UserId};
//!
//! let engine = PointEngine::new();
//!
//! engine.charge(UserId(1), 1_000).unwrap();
//! let balance = engine.use_points(UserId(1), 300).unwrap();
//! assert_eq!(balance.point, 700);
//!
//! assert_eq!(engine.use_points(UserId(1), 701), Err(PointError::ExceedingUse));
//!
//! let history = engine.history(UserId(1));
//! assert_eq!(history.len(), 2);
//! assert_eq!(history[1].kind, TransactionKind::Use);
//! ```
//!
//! ## Thread Safety
//!
//! Mutations of one user are serialized through that user's lock, so no
//! update is ever lost. Mutations of different users run in parallel.

pub mod balance;
mod base;
mod clock;
mod engine;
pub mod error;
mod keyed_lock;
pub mod ledger;
mod transaction;

pub use balance::{BalanceStore, UserPoint};
pub use base::{EntryId, MAX_POINT, UserId};
pub use clock::{Clock, SystemClock};
pub use engine::PointEngine;
pub use error::PointError;
pub use keyed_lock::KeyedLock;
pub use ledger::{LedgerEntry, LedgerStore};
pub use transaction::{TransactionKind, UnknownKind};
