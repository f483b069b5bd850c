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

//! Append-only per-account movement history.
//!
//! Every appended movement gets the next sequence number of its account.
//! Only the newest `retention` entries are kept in memory for retrieval;
//! the sequence keeps counting everything ever appended.

use crate::movement::{Movement, PendingMovement};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// Movement history of a single account, oldest entry first.
///
/// Not synchronized on its own: it lives inside the account state so that
/// appending and the matching balance update happen under the same lock.
#[derive(Debug, Clone)]
pub struct MovementLog {
    entries: VecDeque<Movement>,
    appended: u64,
    retention: usize,
}

impl MovementLog {
    /// Number of movements exposed by a statement.
    pub const RECENT: usize = 10;

    pub fn new() -> Self {
        Self::with_retention(Self::RECENT)
    }

    /// Creates a log that retains at least [`MovementLog::RECENT`] entries.
    pub fn with_retention(retention: usize) -> Self {
        let retention = retention.max(Self::RECENT);
        Self {
            entries: VecDeque::with_capacity(retention.min(1024)),
            appended: 0,
            retention,
        }
    }

    /// Records an applied movement, returning it with its sequence number.
    pub fn append(&mut self, pending: PendingMovement, occurred_at: DateTime<Utc>) -> &Movement {
        self.appended += 1;
        if self.entries.len() == self.retention {
            self.entries.pop_front();
        }
        self.entries.push_back(Movement {
            seq: self.appended,
            amount: pending.amount,
            kind: pending.kind,
            description: pending.description,
            occurred_at,
        });
        &self.entries[self.entries.len() - 1]
    }

    /// Up to `n` movements, most recent first.
    pub fn recent(&self, n: usize) -> Vec<Movement> {
        self.entries.iter().rev().take(n).cloned().collect()
    }

    /// Total number of movements ever appended.
    pub fn len(&self) -> u64 {
        self.appended
    }

    pub fn is_empty(&self) -> bool {
        self.appended == 0
    }

    pub fn retention(&self) -> usize {
        self.retention
    }
}

impl Default for MovementLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::AccountId;
    use crate::movement::{MovementKind, MovementRequest};

    fn pending(amount: i64) -> PendingMovement {
        MovementRequest::credit(AccountId(1), amount, format!("c{amount}"))
            .validate()
            .unwrap()
    }

    #[test]
    fn empty_log_has_no_recent_movements() {
        let log = MovementLog::new();
        assert!(log.is_empty());
        assert!(log.recent(10).is_empty());
    }

    #[test]
    fn append_assigns_increasing_sequence() {
        let mut log = MovementLog::new();
        assert_eq!(log.append(pending(1), Utc::now()).seq, 1);
        assert_eq!(log.append(pending(2), Utc::now()).seq, 2);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn recent_is_most_recent_first() {
        let mut log = MovementLog::new();
        for amount in 1..=3 {
            log.append(pending(amount), Utc::now());
        }
        let amounts: Vec<i64> = log.recent(10).iter().map(|m| m.amount).collect();
        assert_eq!(amounts, vec![3, 2, 1]);
    }

    #[test]
    fn recent_is_capped_at_n() {
        let mut log = MovementLog::new();
        for amount in 1..=15 {
            log.append(pending(amount), Utc::now());
        }
        let recent = log.recent(MovementLog::RECENT);
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].seq, 15);
        assert_eq!(recent[9].seq, 6);
        assert_eq!(log.recent(3).len(), 3);
    }

    #[test]
    fn retention_drops_oldest_but_keeps_counting() {
        let mut log = MovementLog::with_retention(10);
        for amount in 1..=25 {
            log.append(pending(amount), Utc::now());
        }
        assert_eq!(log.len(), 25);
        assert_eq!(log.recent(usize::MAX).len(), 10);
    }

    #[test]
    fn retention_never_below_statement_size() {
        assert_eq!(MovementLog::with_retention(2).retention(), MovementLog::RECENT);
        assert_eq!(MovementLog::with_retention(50).retention(), 50);
    }

    #[test]
    fn appended_movement_keeps_kind() {
        let mut log = MovementLog::new();
        let debit = MovementRequest::debit(AccountId(1), 9, "d")
            .validate()
            .unwrap();
        let movement = log.append(debit, Utc::now());
        assert_eq!(movement.kind, MovementKind::Debit);
        assert_eq!(movement.signed_amount(), -9);
    }
}
