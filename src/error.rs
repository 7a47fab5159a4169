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

//! Error types for point operations.

use thiserror::Error;

/// Rejections raised by the point engine.
///
/// Every variant is raised before any state is written, so a rejected call
/// never leaves a partial ledger entry or balance behind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PointError {
    /// User id is zero or negative
    #[error("invalid user id")]
    InvalidUserId,

    /// Charge amount is zero or negative
    #[error("invalid charge amount")]
    InvalidChargeAmount,

    /// Charge would push the balance above the maximum
    #[error("charge exceeds the maximum balance")]
    ExceedingCharge,

    /// Use would push the balance below zero
    #[error("use exceeds the current balance")]
    ExceedingUse,

    /// Use amount is zero or negative
    #[error("invalid use amount")]
    InvalidUseAmount,
}

impl PointError {
    /// Stable error code reported to callers.
    pub fn code(&self) -> &'static str {
        match self {
            PointError::InvalidUserId => "1001",
            PointError::InvalidChargeAmount => "1002",
            PointError::ExceedingCharge => "1003",
            PointError::ExceedingUse => "1004",
            PointError::InvalidUseAmount => "1005",
        }
    }
}
