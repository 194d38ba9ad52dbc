//! Error sink implementations.
//!
//! A sink receives the cause of every failed unit. Sinks are called from the
//! completion path, so they should return quickly; panics are contained by
//! the scheduler.

use std::collections::VecDeque;

use parking_lot::Mutex;

use super::work::{WorkFailure, WorkId};
use crate::util::clock::now_ms;

/// Failure record kept by [`InMemoryErrorSink`].
#[derive(Debug, Clone)]
pub struct FailureEvent {
    /// Unit that failed.
    pub unit_id: WorkId,
    /// Failure cause.
    pub cause: WorkFailure,
    /// Timestamp milliseconds.
    pub reported_at_ms: u128,
}

/// Error sink abstraction.
pub trait ErrorSink: Send + Sync {
    /// Report a failed unit.
    fn report(&self, unit_id: WorkId, cause: &WorkFailure);
}

/// Sink that logs failures through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn report(&self, unit_id: WorkId, cause: &WorkFailure) {
        tracing::error!(unit_id = %unit_id, error = %cause, "unit of work failed");
    }
}

/// In-memory sink for testing and dev, bounded to the most recent events.
pub struct InMemoryErrorSink {
    events: Mutex<VecDeque<FailureEvent>>,
    max_events: usize,
}

impl InMemoryErrorSink {
    /// Create a new in-memory sink with a bounded buffer. Zero keeps nothing.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(max_events)),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    #[must_use]
    pub fn events(&self) -> Vec<FailureEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Number of stored events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether no failure has been reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl ErrorSink for InMemoryErrorSink {
    fn report(&self, unit_id: WorkId, cause: &WorkFailure) {
        if self.max_events == 0 {
            return;
        }
        let mut events = self.events.lock();
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(FailureEvent {
            unit_id,
            cause: cause.clone(),
            reported_at_ms: now_ms(),
        });
    }
}
