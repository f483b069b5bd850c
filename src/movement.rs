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

//! Movements: the credit and debit events recorded against an account.
//!
//! A [`MovementRequest`] is what callers submit. It is validated into a
//! [`PendingMovement`] before any account is touched, and only becomes a
//! [`Movement`] once the ledger has applied it.

use crate::base::AccountId;
use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of a movement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    Credit,
    Debit,
}

impl MovementKind {
    /// Signed effect of `amount` on a balance.
    pub fn signed(self, amount: i64) -> i64 {
        match self {
            Self::Credit => amount,
            Self::Debit => -amount,
        }
    }
}

impl fmt::Display for MovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Credit => f.write_str("credit"),
            Self::Debit => f.write_str("debit"),
        }
    }
}

/// Free-text movement description of 1 to 10 Unicode code points.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Description(String);

impl Description {
    pub const MAX_CHARS: usize = 10;

    pub fn new(text: impl Into<String>) -> Result<Self, ValidationError> {
        let text = text.into();
        // Code points, not bytes: "ação" is 4 characters.
        match text.chars().count() {
            0 => Err(ValidationError::EmptyDescription),
            n if n > Self::MAX_CHARS => Err(ValidationError::DescriptionTooLong(n)),
            _ => Ok(Self(text)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A movement submitted by a caller, not yet validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementRequest {
    pub account_id: AccountId,
    pub amount: i64,
    pub kind: MovementKind,
    pub description: String,
}

impl MovementRequest {
    pub fn new(
        account_id: AccountId,
        amount: i64,
        kind: MovementKind,
        description: impl Into<String>,
    ) -> Self {
        Self {
            account_id,
            amount,
            kind,
            description: description.into(),
        }
    }

    pub fn credit(account_id: AccountId, amount: i64, description: impl Into<String>) -> Self {
        Self::new(account_id, amount, MovementKind::Credit, description)
    }

    pub fn debit(account_id: AccountId, amount: i64, description: impl Into<String>) -> Self {
        Self::new(account_id, amount, MovementKind::Debit, description)
    }

    /// Checks the request preconditions without touching any account.
    pub fn validate(self) -> Result<PendingMovement, ValidationError> {
        if self.amount < 1 {
            return Err(ValidationError::NonPositiveAmount);
        }
        let description = Description::new(self.description)?;
        Ok(PendingMovement {
            amount: self.amount,
            kind: self.kind,
            description,
        })
    }
}

/// A validated movement waiting to be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMovement {
    pub amount: i64,
    pub kind: MovementKind,
    pub description: Description,
}

/// An applied, immutable movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Movement {
    /// Position in the account's log, starting at 1.
    pub seq: u64,
    pub amount: i64,
    pub kind: MovementKind,
    pub description: Description,
    pub occurred_at: DateTime<Utc>,
}

impl Movement {
    pub fn signed_amount(&self) -> i64 {
        self.kind.signed(self.amount)
    }
}
