//! FIFO queue of units waiting for a running slot.

use std::collections::VecDeque;

use parking_lot::Mutex;

use super::work::UnitOfWork;

/// Thread-safe FIFO of not-yet-started units.
///
/// The mutex is held only for the push/pop itself, never across a call into
/// the execution substrate.
#[derive(Debug, Default)]
pub struct PendingQueue {
    units: Mutex<VecDeque<UnitOfWork>>,
}

impl PendingQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a unit at the back.
    pub fn push(&self, unit: UnitOfWork) {
        self.units.lock().push_back(unit);
    }

    /// Remove the oldest unit, if any.
    pub fn pop(&self) -> Option<UnitOfWork> {
        self.units.lock().pop_front()
    }

    /// Remove every queued unit, oldest first.
    pub fn drain(&self) -> Vec<UnitOfWork> {
        self.units.lock().drain(..).collect()
    }

    /// Current depth.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.lock().len()
    }

    /// Whether nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.lock().is_empty()
    }

    /// Copy of the queued handles in FIFO order. Advisory only: races with promotion.
    #[must_use]
    pub fn snapshot(&self) -> Vec<UnitOfWork> {
        self.units.lock().iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let queue = PendingQueue::new();
        let units: Vec<_> = (0..3).map(|_| UnitOfWork::new(|| {})).collect();
        for unit in &units {
            queue.push(unit.clone());
        }

        assert_eq!(queue.len(), 3);
        for unit in &units {
            assert_eq!(queue.pop().map(|u| u.id()), Some(unit.id()));
        }
        assert!(queue.pop().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_drain_empties_queue() {
        let queue = PendingQueue::new();
        queue.push(UnitOfWork::new(|| {}));
        queue.push(UnitOfWork::new(|| {}));

        let drained = queue.drain();
        assert_eq!(drained.len(), 2);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_snapshot_does_not_consume() {
        let queue = PendingQueue::new();
        let unit = UnitOfWork::new(|| {});
        queue.push(unit.clone());

        let snapshot = queue.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id(), unit.id());
        assert_eq!(queue.len(), 1);
    }
}
