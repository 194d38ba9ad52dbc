//! Admission gate: lock-free accounting of running units against a fixed capacity.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Counter of currently running units compared against a fixed capacity.
///
/// `try_acquire` is a strict gate (CAS loop), so concurrent submitters can never
/// push the running count above capacity. `acquire_unchecked` bypasses the
/// check and is reserved for the shutdown drain.
#[derive(Debug)]
pub struct AdmissionGate {
    capacity: usize,
    running: AtomicUsize,
}

impl AdmissionGate {
    /// Create a gate admitting up to `capacity` concurrent units.
    #[must_use]
    pub const fn new(capacity: usize) -> Self {
        Self {
            capacity,
            running: AtomicUsize::new(0),
        }
    }

    /// Try to reserve a running slot atomically using a CAS loop.
    /// Returns true if a slot was reserved, false if the gate is full.
    pub fn try_acquire(&self) -> bool {
        let mut current = self.running.load(Ordering::Acquire);
        loop {
            if current >= self.capacity {
                return false;
            }
            match self.running.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Reserve a slot regardless of capacity.
    pub fn acquire_unchecked(&self) {
        self.running.fetch_add(1, Ordering::AcqRel);
    }

    /// Release a slot and return the number of units still running.
    pub fn release(&self) -> usize {
        let previous = self.running.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "released more slots than were acquired");
        previous.saturating_sub(1)
    }

    /// Snapshot of running units.
    #[must_use]
    pub fn running(&self) -> usize {
        self.running.load(Ordering::Acquire)
    }

    /// Configured capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}
