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

//! Error types for ledger operations and provisioning.

use crate::base::AccountId;
use thiserror::Error;

/// Ledger operation errors.
///
/// Every variant is an ordinary outcome of an operation. None of them leave
/// an account or its movement log partially modified.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The request failed validation; no storage was touched
    #[error("invalid input: {0}")]
    InvalidInput(#[from] ValidationError),

    /// The account id is not provisioned
    #[error("account {0} not found")]
    NotFound(AccountId),

    /// A debit would take the balance below `-limit`
    #[error("insufficient limit")]
    LimitExceeded,

    /// The operation could not commit before its deadline
    #[error("service overloaded")]
    Overloaded,

    /// Unexpected fault; the message is for logs only
    #[error("internal error: {0}")]
    Internal(String),
}

/// Reasons a movement request is rejected before it reaches an account.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("amount must be a positive integer")]
    NonPositiveAmount,

    #[error("description must not be empty")]
    EmptyDescription,

    #[error("description has {0} characters, at most 10 allowed")]
    DescriptionTooLong(usize),

    #[error("malformed request payload")]
    MalformedPayload,
}

/// Provisioning and configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read accounts: {0}")]
    Csv(#[from] csv::Error),

    #[error("no accounts provisioned")]
    NoAccounts,

    #[error("account {0} provisioned more than once")]
    DuplicateAccount(AccountId),

    #[error("account {id} has negative limit {limit}")]
    NegativeLimit { id: AccountId, limit: i64 },

    #[error("account {id} opens at {balance}, below its limit of {limit}")]
    OpeningBalanceBelowLimit {
        id: AccountId,
        balance: i64,
        limit: i64,
    },

    #[error("max in-flight operations must be at least 1")]
    ZeroCapacity,

    #[error("operation deadline must be greater than zero")]
    ZeroDeadline,
}
