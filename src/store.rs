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

//! Provisioned account store.
//!
//! The account set is fixed when the store is built. Lookups hand out an
//! `Arc<Account>` so the map's shard lock is released before any account
//! lock is taken; accounts never block each other.

use crate::account::Account;
use crate::base::AccountId;
use crate::config::AccountSpec;
use crate::error::{ConfigError, LedgerError};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;

#[derive(Debug)]
pub struct AccountStore {
    accounts: DashMap<AccountId, Arc<Account>>,
}

impl AccountStore {
    /// Provisions one account per spec.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::NoAccounts`] - `specs` is empty.
    /// - [`ConfigError::DuplicateAccount`] - an id appears twice.
    /// - [`ConfigError::NegativeLimit`] - a limit is below zero.
    /// - [`ConfigError::OpeningBalanceBelowLimit`] - an opening balance is below `-limit`.
    pub fn provision(specs: &[AccountSpec], retention: usize) -> Result<Self, ConfigError> {
        if specs.is_empty() {
            return Err(ConfigError::NoAccounts);
        }

        let accounts = DashMap::with_capacity(specs.len());
        for spec in specs {
            if spec.limit < 0 {
                return Err(ConfigError::NegativeLimit {
                    id: spec.id,
                    limit: spec.limit,
                });
            }
            if spec.balance < -spec.limit {
                return Err(ConfigError::OpeningBalanceBelowLimit {
                    id: spec.id,
                    balance: spec.balance,
                    limit: spec.limit,
                });
            }

            match accounts.entry(spec.id) {
                Entry::Occupied(_) => return Err(ConfigError::DuplicateAccount(spec.id)),
                Entry::Vacant(entry) => {
                    entry.insert(Arc::new(Account::with_opening_balance(
                        spec.id,
                        spec.limit,
                        spec.balance,
                        retention,
                    )));
                }
            }
        }

        Ok(Self { accounts })
    }

    /// Returns `(limit, balance)` for a provisioned account.
    ///
    /// Reads through [`Account::balance`], so it neither takes a gate permit
    /// nor honours a deadline.
    pub fn get(&self, id: AccountId) -> Result<(i64, i64), LedgerError> {
        let account = self.account(id)?;
        Ok((account.limit(), account.balance()))
    }

    /// Resolves an id to its account handle.
    pub fn account(&self, id: AccountId) -> Result<Arc<Account>, LedgerError> {
        self.accounts
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(LedgerError::NotFound(id))
    }

    pub fn contains(&self, id: AccountId) -> bool {
        self.accounts.contains_key(&id)
    }

    /// Provisioned ids in ascending order.
    pub fn ids(&self) -> Vec<AccountId> {
        let mut ids: Vec<AccountId> = self.accounts.iter().map(|entry| *entry.key()).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}
