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

//! The ledger: movement application and statements.
//!
//! [`Ledger`] is the store handle every operation goes through. It owns the
//! provisioned accounts, the admission gate and the per-operation deadline.
//!
//! # Operation Protocol
//!
//! 1. Validate the request. Failures return [`LedgerError::InvalidInput`]
//!    before any account is touched.
//! 2. Take a gate permit before the deadline. The deadline is fixed by the
//!    caller when the request arrives ([`Ledger::apply_until`]) or starts
//!    now ([`Ledger::apply`]); an already expired one is [`LedgerError::Overloaded`].
//! 3. Resolve the account ([`LedgerError::NotFound`] if not provisioned).
//! 4. Run the account's atomic unit under its own lock.
//!
//! # Thread Safety
//!
//! Each account has its own lock. Operations on different accounts run in
//! parallel; operations on one account are totally ordered.

use crate::base::AccountId;
use crate::config::LedgerConfig;
use crate::error::{ConfigError, LedgerError};
use crate::gate::{Permit, RequestGate};
use crate::movement::{Movement, MovementRequest};
use crate::movement_log::MovementLog;
use crate::store::AccountStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Account state right after a movement was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Applied {
    pub balance: i64,
    pub limit: i64,
}

/// Point-in-time snapshot of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statement {
    pub account_id: AccountId,
    pub limit: i64,
    pub balance: i64,
    pub as_of: DateTime<Utc>,
    /// Most recent first, at most [`MovementLog::RECENT`] entries.
    pub recent_movements: Vec<Movement>,
}

/// Bounded-overdraft ledger over a fixed set of accounts.
///
/// # Invariants
///
/// - For every account, `balance >= -limit` at every observable instant.
/// - `balance` equals the opening balance plus credits minus debits over
///   exactly the applied movements.
/// - A rejected or timed-out operation changes neither balance nor log.
#[derive(Debug)]
pub struct Ledger {
    store: AccountStore,
    gate: RequestGate,
    deadline: Duration,
}

impl Ledger {
    /// Provisions the accounts in `config`.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`] raised by the resource budget or account specs.
    pub fn new(config: LedgerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let store = AccountStore::provision(&config.accounts, config.retention)?;
        Ok(Self {
            store,
            gate: RequestGate::new(config.max_in_flight),
            deadline: config.deadline,
        })
    }

    /// Applies a credit or debit to one account.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidInput`] - amount below 1 or description not 1..=10 characters.
    /// - [`LedgerError::NotFound`] - account id not provisioned.
    /// - [`LedgerError::LimitExceeded`] - debit would take the balance below `-limit`.
    /// - [`LedgerError::Overloaded`] - the deadline passed before the movement committed.
    /// - [`LedgerError::Internal`] - the balance would overflow.
    pub fn apply(&self, request: MovementRequest) -> Result<Applied, LedgerError> {
        self.apply_until(request, self.deadline_from_now())
    }

    /// Same as [`Ledger::apply`] with a deadline fixed by the caller.
    ///
    /// # Errors
    ///
    /// As [`Ledger::apply`]. A deadline already in the past is
    /// [`LedgerError::Overloaded`] for any valid request.
    pub fn apply_until(
        &self,
        request: MovementRequest,
        deadline: Instant,
    ) -> Result<Applied, LedgerError> {
        let account_id = request.account_id;
        let (amount, kind) = (request.amount, request.kind);

        let result = request
            .validate()
            .map_err(LedgerError::from)
            .and_then(|pending| {
                let _permit = self.admit(deadline)?;
                self.store.account(account_id)?.apply(pending, deadline)
            });

        match &result {
            Ok(applied) => debug!(
                account = %account_id,
                amount,
                %kind,
                balance = applied.balance,
                "movement applied"
            ),
            Err(e) => Self::log_failure("movement", account_id, e),
        }
        result
    }

    /// Returns limit, balance and the last movements of an account as one
    /// consistent snapshot.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::NotFound`] - account id not provisioned.
    /// - [`LedgerError::Overloaded`] - the deadline passed before the snapshot was taken.
    pub fn statement(&self, account_id: AccountId) -> Result<Statement, LedgerError> {
        self.statement_until(account_id, self.deadline_from_now())
    }

    /// Same as [`Ledger::statement`] with a deadline fixed by the caller.
    pub fn statement_until(
        &self,
        account_id: AccountId,
        deadline: Instant,
    ) -> Result<Statement, LedgerError> {
        let result = self.admit(deadline).and_then(|_permit| {
            self.store
                .account(account_id)?
                .statement(MovementLog::RECENT, deadline)
        });

        if let Err(e) = &result {
            Self::log_failure("statement", account_id, e);
        }
        result
    }

    /// Up to `n` movements of an account, most recent first.
    pub fn recent_movements(
        &self,
        account_id: AccountId,
        n: usize,
    ) -> Result<Vec<Movement>, LedgerError> {
        let deadline = self.deadline_from_now();
        let _permit = self.admit(deadline)?;
        let statement = self.store.account(account_id)?.statement(n, deadline)?;
        Ok(statement.recent_movements)
    }

    pub fn store(&self) -> &AccountStore {
        &self.store
    }

    pub fn gate(&self) -> &RequestGate {
        &self.gate
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// The instant an operation starting now must finish by.
    pub fn deadline_from_now(&self) -> Instant {
        let now = Instant::now();
        now.checked_add(self.deadline)
            .unwrap_or_else(|| now + Duration::from_secs(u32::MAX as u64))
    }

    fn admit(&self, deadline: Instant) -> Result<Permit<'_>, LedgerError> {
        if Instant::now() >= deadline {
            return Err(LedgerError::Overloaded);
        }
        self.gate.acquire(deadline)
    }

    fn log_failure(operation: &str, account_id: AccountId, e: &LedgerError) {
        match e {
            LedgerError::Overloaded => warn!(account = %account_id, "{operation} aborted: {e}"),
            LedgerError::Internal(_) => error!(account = %account_id, "{operation} failed: {e}"),
            _ => debug!(account = %account_id, reason = %e, "{operation} rejected"),
        }
    }
}
