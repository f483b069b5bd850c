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

//! Admission control for ledger operations.
//!
//! The gate holds a fixed number of permits in a bounded channel. An
//! operation takes one permit for its whole lifetime and returns it on drop.
//! When every permit is out, callers wait at most until their deadline and
//! are then turned away with [`LedgerError::Overloaded`].

use crate::LedgerError;
use crossbeam::channel::{self, Receiver, Sender};
use std::time::Instant;

#[derive(Debug)]
pub struct RequestGate {
    release: Sender<()>,
    permits: Receiver<()>,
    capacity: usize,
}

impl RequestGate {
    /// Creates a gate admitting up to `capacity` concurrent operations.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (release, permits) = channel::bounded(capacity);
        for _ in 0..capacity {
            // Cannot fail: the channel has room for every permit and we hold
            // the receiver.
            let _ = release.try_send(());
        }
        Self {
            release,
            permits,
            capacity,
        }
    }

    /// Waits for a permit until `deadline`.
    pub fn acquire(&self, deadline: Instant) -> Result<Permit<'_>, LedgerError> {
        self.permits
            .recv_deadline(deadline)
            .map(|()| Permit { gate: self })
            .map_err(|_| LedgerError::Overloaded)
    }

    /// Takes a permit only if one is free right now.
    pub fn try_acquire(&self) -> Result<Permit<'_>, LedgerError> {
        self.permits
            .try_recv()
            .map(|()| Permit { gate: self })
            .map_err(|_| LedgerError::Overloaded)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Operations currently holding a permit.
    pub fn in_flight(&self) -> usize {
        self.capacity - self.permits.len()
    }
}

/// Admission slot, released when dropped.
#[derive(Debug)]
#[must_use = "the operation is only admitted while the permit is held"]
pub struct Permit<'a> {
    gate: &'a RequestGate,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        let _ = self.gate.release.try_send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn zero_capacity_is_raised_to_one() {
        assert_eq!(RequestGate::new(0).capacity(), 1);
    }

    #[test]
    fn permits_are_counted() {
        let gate = RequestGate::new(3);
        assert_eq!(gate.in_flight(), 0);
        let first = gate.try_acquire().unwrap();
        let _second = gate.try_acquire().unwrap();
        assert_eq!(gate.in_flight(), 2);
        drop(first);
        assert_eq!(gate.in_flight(), 1);
    }

    #[test]
    fn exhausted_gate_rejects_immediately_on_try() {
        let gate = RequestGate::new(1);
        let _held = gate.try_acquire().unwrap();
        assert_eq!(gate.try_acquire().unwrap_err(), LedgerError::Overloaded);
    }

    #[test]
    fn exhausted_gate_rejects_after_deadline() {
        let gate = RequestGate::new(1);
        let _held = gate.try_acquire().unwrap();
        let started = Instant::now();
        let result = gate.acquire(started + Duration::from_millis(30));
        assert_eq!(result.unwrap_err(), LedgerError::Overloaded);
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn waiter_is_admitted_when_permit_is_released() {
        let gate = Arc::new(RequestGate::new(1));
        let held = gate.try_acquire().unwrap();

        let waiter = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || {
                gate.acquire(Instant::now() + Duration::from_secs(5))
                    .map(|_permit| ())
            })
        };

        thread::sleep(Duration::from_millis(20));
        drop(held);
        assert_eq!(waiter.join().unwrap(), Ok(()));
        assert_eq!(gate.in_flight(), 0);
    }
}
