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

//! Account state and its atomic units.
//!
//! An [`Account`] pairs an immutable credit limit with a lock-protected
//! balance and movement log. Mutations take the write lock, statements take
//! the read lock, and both give up once the operation deadline passes.
//!
//! # Example
//!
//! ```
//! use overdraft_ledger::{Account, AccountId};
//!
//! let account = Account::new(AccountId(1), 1000);
//! assert_eq!(account.limit(), 1000);
//! assert_eq!(account.balance(), 0);
//! ```

use crate::base::AccountId;
use crate::ledger::{Applied, Statement};
use crate::movement::{MovementKind, PendingMovement};
use crate::movement_log::MovementLog;
use crate::LedgerError;
use chrono::Utc;
use parking_lot::RwLock;
use std::time::Instant;

#[derive(Debug)]
struct AccountState {
    balance: i64,
    log: MovementLog,
}

impl AccountState {
    fn assert_invariants(&self, limit: i64) {
        debug_assert!(
            self.balance >= -limit,
            "Invariant violated: balance {} is below limit -{}",
            self.balance,
            limit
        );
    }

    /// Limit check, balance update and log append as one step.
    ///
    /// Nothing is written unless every check passes.
    fn apply(
        &mut self,
        id: AccountId,
        limit: i64,
        pending: PendingMovement,
        deadline: Instant,
    ) -> Result<i64, LedgerError> {
        let candidate = self
            .balance
            .checked_add(pending.kind.signed(pending.amount))
            .ok_or_else(|| LedgerError::Internal(format!("balance overflow on account {id}")))?;

        if pending.kind == MovementKind::Debit && candidate < -limit {
            return Err(LedgerError::LimitExceeded);
        }

        // Last point where the unit can still be abandoned untouched.
        if Instant::now() >= deadline {
            return Err(LedgerError::Overloaded);
        }

        self.balance = candidate;
        self.log.append(pending, Utc::now());
        self.assert_invariants(limit);
        Ok(candidate)
    }
}

/// Ledger account with a fixed overdraft limit.
#[derive(Debug)]
pub struct Account {
    id: AccountId,
    limit: i64,
    state: RwLock<AccountState>,
}

impl Account {
    pub fn new(id: AccountId, limit: i64) -> Self {
        Self::with_opening_balance(id, limit, 0, MovementLog::RECENT)
    }

    /// Creates an account that starts at `balance` and keeps `retention`
    /// movements in memory.
    ///
    /// Callers are expected to have checked `balance >= -limit`.
    pub fn with_opening_balance(id: AccountId, limit: i64, balance: i64, retention: usize) -> Self {
        Self {
            id,
            limit,
            state: RwLock::new(AccountState {
                balance,
                log: MovementLog::with_retention(retention),
            }),
        }
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    /// Current balance.
    ///
    /// Waits on the account lock without a deadline and outside the request
    /// gate. For diagnostics and tests; request paths use [`Account::statement`].
    pub fn balance(&self) -> i64 {
        self.state.read().balance
    }

    /// Number of movements ever applied to this account.
    ///
    /// Untimed like [`Account::balance`].
    pub fn movement_count(&self) -> u64 {
        self.state.read().log.len()
    }

    /// Applies a validated movement under the account's write lock.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::LimitExceeded`] - debit would take the balance below `-limit`.
    /// - [`LedgerError::Overloaded`] - the lock was not obtained, or the unit could
    ///   not commit, before `deadline`.
    /// - [`LedgerError::Internal`] - the new balance does not fit in an `i64`.
    pub fn apply(&self, pending: PendingMovement, deadline: Instant) -> Result<Applied, LedgerError> {
        let mut state = self
            .state
            .try_write_until(deadline)
            .ok_or(LedgerError::Overloaded)?;
        let balance = state.apply(self.id, self.limit, pending, deadline)?;
        Ok(Applied {
            balance,
            limit: self.limit,
        })
    }

    /// Reads limit, balance and the newest `n` movements as one snapshot.
    ///
    /// # Errors
    ///
    /// [`LedgerError::Overloaded`] if the read lock was not obtained before `deadline`.
    pub fn statement(&self, n: usize, deadline: Instant) -> Result<Statement, LedgerError> {
        let state = self
            .state
            .try_read_until(deadline)
            .ok_or(LedgerError::Overloaded)?;
        Ok(Statement {
            account_id: self.id,
            limit: self.limit,
            balance: state.balance,
            as_of: Utc::now(),
            recent_movements: state.log.recent(n),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movement::MovementRequest;
    use std::sync::Arc;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    fn pending(request: MovementRequest) -> PendingMovement {
        request.validate().unwrap()
    }

    fn far_deadline() -> Instant {
        Instant::now() + Duration::from_secs(10)
    }

    // === AccountState Internal Tests ===

    #[test]
    fn state_credit_increases_balance() {
        let mut state = AccountState {
            balance: 0,
            log: MovementLog::new(),
        };
        let credit = pending(MovementRequest::credit(AccountId(1), 700, "salary"));
        assert_eq!(state.apply(AccountId(1), 0, credit, far_deadline()), Ok(700));
        assert_eq!(state.log.len(), 1);
    }

    #[test]
    fn state_debit_may_reach_exactly_minus_limit() {
        let mut state = AccountState {
            balance: 0,
            log: MovementLog::new(),
        };
        let debit = pending(MovementRequest::debit(AccountId(1), 1000, "all"));
        assert_eq!(state.apply(AccountId(1), 1000, debit, far_deadline()), Ok(-1000));
    }

    #[test]
    fn state_rejected_debit_writes_nothing() {
        let mut state = AccountState {
            balance: -500,
            log: MovementLog::new(),
        };
        let debit = pending(MovementRequest::debit(AccountId(1), 600, "too much"));
        assert_eq!(
            state.apply(AccountId(1), 1000, debit, far_deadline()),
            Err(LedgerError::LimitExceeded)
        );
        assert_eq!(state.balance, -500);
        assert!(state.log.is_empty());
    }

    #[test]
    fn state_expired_deadline_writes_nothing() {
        let mut state = AccountState {
            balance: 0,
            log: MovementLog::new(),
        };
        let credit = pending(MovementRequest::credit(AccountId(1), 10, "late"));
        let expired = Instant::now();
        thread::sleep(Duration::from_millis(1));
        assert_eq!(
            state.apply(AccountId(1), 0, credit, expired),
            Err(LedgerError::Overloaded)
        );
        assert_eq!(state.balance, 0);
        assert!(state.log.is_empty());
    }

    #[test]
    fn state_overflow_is_internal() {
        let mut state = AccountState {
            balance: i64::MAX - 1,
            log: MovementLog::new(),
        };
        let credit = pending(MovementRequest::credit(AccountId(1), 2, "overflow"));
        let result = state.apply(AccountId(1), 0, credit, far_deadline());
        assert!(matches!(result, Err(LedgerError::Internal(_))));
        assert_eq!(state.balance, i64::MAX - 1);
    }

    // === Account Tests ===

    #[test]
    fn apply_reports_new_balance_and_limit() {
        let account = Account::new(AccountId(1), 1000);
        let applied = account
            .apply(pending(MovementRequest::debit(AccountId(1), 500, "d")), far_deadline())
            .unwrap();
        assert_eq!(applied, Applied { balance: -500, limit: 1000 });
        assert_eq!(account.balance(), -500);
        assert_eq!(account.movement_count(), 1);
    }

    #[test]
    fn statement_matches_state() {
        let account = Account::with_opening_balance(AccountId(3), 100, 50, 10);
        account
            .apply(pending(MovementRequest::credit(AccountId(3), 5, "c")), far_deadline())
            .unwrap();
        let statement = account.statement(10, far_deadline()).unwrap();
        assert_eq!(statement.account_id, AccountId(3));
        assert_eq!(statement.balance, 55);
        assert_eq!(statement.limit, 100);
        assert_eq!(statement.recent_movements.len(), 1);
        assert_eq!(statement.recent_movements[0].amount, 5);
    }

    #[test]
    fn apply_times_out_while_account_is_held() {
        let account = Arc::new(Account::new(AccountId(1), 1000));
        let (held_tx, held_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        let holder = {
            let account = Arc::clone(&account);
            thread::spawn(move || {
                let _guard = account.state.write();
                held_tx.send(()).unwrap();
                release_rx.recv().unwrap();
            })
        };
        held_rx.recv().unwrap();

        let deadline = Instant::now() + Duration::from_millis(50);
        let result = account.apply(
            pending(MovementRequest::credit(AccountId(1), 10, "blocked")),
            deadline,
        );
        assert_eq!(result, Err(LedgerError::Overloaded));

        let statement = account.statement(10, Instant::now() + Duration::from_millis(50));
        assert_eq!(statement.unwrap_err(), LedgerError::Overloaded);

        release_tx.send(()).unwrap();
        holder.join().unwrap();

        assert_eq!(account.balance(), 0);
        assert_eq!(account.movement_count(), 0);
    }

    #[test]
    fn statements_share_the_lock() {
        let account = Arc::new(Account::new(AccountId(1), 1000));
        let _reader = account.state.read();
        let statement = account.statement(10, Instant::now() + Duration::from_millis(50));
        assert!(statement.is_ok());
    }
}
