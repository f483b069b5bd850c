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

//! Deployment configuration: provisioned accounts and resource budget.
//!
//! Accounts can be loaded from a CSV file with columns `id, limit` and an
//! optional `balance` (opening balance, defaults to 0):
//!
//! ```csv
//! id,limit,balance
//! 1,100000,0
//! 2,80000,-200
//! ```

use crate::base::AccountId;
use crate::error::ConfigError;
use crate::movement_log::MovementLog;
use csv::{ReaderBuilder, Trim};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use std::time::Duration;

/// One provisioned account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSpec {
    pub id: AccountId,
    pub limit: i64,
    #[serde(default)]
    pub balance: i64,
}

impl AccountSpec {
    pub fn new(id: u32, limit: i64) -> Self {
        Self {
            id: AccountId(id),
            limit,
            balance: 0,
        }
    }
}

/// Everything needed to build a [`Ledger`](crate::Ledger).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    pub accounts: Vec<AccountSpec>,
    /// Upper bound on concurrently admitted operations.
    pub max_in_flight: usize,
    /// Time budget of a single operation, gate wait included.
    pub deadline: Duration,
    /// Movements kept in memory per account.
    pub retention: usize,
}

impl LedgerConfig {
    pub const DEFAULT_MAX_IN_FLIGHT: usize = 35;
    pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(10);

    /// The five accounts of the reference deployment.
    pub fn reference_accounts() -> Vec<AccountSpec> {
        vec![
            AccountSpec::new(1, 100_000),
            AccountSpec::new(2, 80_000),
            AccountSpec::new(3, 1_000_000),
            AccountSpec::new(4, 10_000_000),
            AccountSpec::new(5, 500_000),
        ]
    }

    pub fn with_accounts(accounts: Vec<AccountSpec>) -> Self {
        Self {
            accounts,
            ..Self::default()
        }
    }

    /// Checks the resource budget. Account specs are checked when the
    /// store is provisioned.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_in_flight == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.deadline.is_zero() {
            return Err(ConfigError::ZeroDeadline);
        }
        Ok(())
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            accounts: Self::reference_accounts(),
            max_in_flight: Self::DEFAULT_MAX_IN_FLIGHT,
            deadline: Self::DEFAULT_DEADLINE,
            retention: MovementLog::RECENT,
        }
    }
}

/// Reads account specs from CSV.
///
/// Unlike transaction input, a malformed row is an error: a ledger must not
/// start with a silently missing account.
pub fn read_accounts<R: Read>(reader: R) -> Result<Vec<AccountSpec>, ConfigError> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    let mut accounts = Vec::new();
    for record in rdr.deserialize::<AccountSpec>() {
        accounts.push(record?);
    }
    Ok(accounts)
}

/// Reads account specs from a CSV file.
pub fn load_accounts(path: impl AsRef<Path>) -> Result<Vec<AccountSpec>, ConfigError> {
    let rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .has_headers(true)
        .from_path(path)?;
    let mut accounts = Vec::new();
    for record in rdr.into_deserialize::<AccountSpec>() {
        accounts.push(record?);
    }
    Ok(accounts)
}
