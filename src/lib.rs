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

//! # Overdraft Ledger
//!
//! This library provides a bounded-overdraft ledger: a fixed set of accounts,
//! each with a credit limit, that accept credits and debits atomically and
//! report consistent statements under heavy concurrency.
//!
//! ## Core Components
//!
//! - [`Ledger`]: Store handle applying movements and producing statements
//! - [`Account`]: Limit, balance and movement log behind one lock
//! - [`MovementLog`]: Append-only per-account history
//! - [`RequestGate`]: Bounds in-flight operations, turns saturation into [`LedgerError::Overloaded`]
//! - [`LedgerError`]: Outcomes other than success
//!
//! ## Example
//!
//! ```
//! use overdraft_ledger::{AccountId, AccountSpec, Ledger, LedgerConfig, LedgerError, MovementRequest};
//!
//! let ledger = Ledger::new(LedgerConfig::with_accounts(vec![AccountSpec::new(1, 1000)])).unwrap();
//!
//! let applied = ledger.apply(MovementRequest::debit(AccountId(1), 500, "rent")).unwrap();
//! assert_eq!(applied.balance, -500);
//!
//! let rejected = ledger.apply(MovementRequest::debit(AccountId(1), 600, "tv"));
//! assert_eq!(rejected, Err(LedgerError::LimitExceeded));
//!
//! let statement = ledger.statement(AccountId(1)).unwrap();
//! assert_eq!(statement.balance, -500);
//! assert_eq!(statement.recent_movements.len(), 1);
//! ```
//!
//! ## Thread Safety
//!
//! Every account has its own lock, so operations on different accounts run in
//! parallel while operations on the same account are serialized.

pub mod account;
mod base;
pub mod config;
pub mod error;
mod gate;
pub mod http;
mod ledger;
mod movement;
mod movement_log;
mod store;

pub use account::Account;
pub use base::AccountId;
pub use config::{AccountSpec, LedgerConfig};
pub use error::{ConfigError, LedgerError, ValidationError};
pub use gate::{Permit, RequestGate};
pub use ledger::{Applied, Ledger, Statement};
pub use movement::{Description, Movement, MovementKind, MovementRequest, PendingMovement};
pub use movement_log::MovementLog;
pub use store::AccountStore;
