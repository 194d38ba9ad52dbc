//! Units of deferred work and their lifecycle.
//!
//! A [`UnitOfWork`] is a cheap, cloneable handle around a zero-argument action.
//! The scheduler owns the right to start it; once started, the execution
//! substrate runs it and the completion hook registered at submission fires
//! exactly once, whether the action returned, failed or panicked.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use super::error::{AppResult, ExecutorError};

/// Unique identifier of a unit of work.
pub type WorkId = Uuid;

const CREATED: u8 = 0;
const STARTED: u8 = 1;
const COMPLETED: u8 = 2;

/// Lifecycle state of a unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkState {
    /// Not yet started; may be submitted.
    Created,
    /// Handed to the substrate.
    Started,
    /// Finished, successfully or not.
    Completed,
}

impl WorkState {
    const fn from_raw(raw: u8) -> Self {
        match raw {
            CREATED => Self::Created,
            STARTED => Self::Started,
            _ => Self::Completed,
        }
    }
}

impl fmt::Display for WorkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Started => write!(f, "started"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// Cause recorded when a unit's action does not finish cleanly.
#[derive(Debug, Clone, Error)]
pub enum WorkFailure {
    /// The action returned an error.
    #[error("work returned an error: {0}")]
    Errored(Arc<anyhow::Error>),
    /// The action panicked; the payload message is preserved when it is a string.
    #[error("work panicked: {0}")]
    Panicked(String),
    /// The substrate dropped the job without running it.
    #[error("work was dropped by the execution substrate before it ran")]
    Abandoned,
}

impl WorkFailure {
    fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Self::Panicked(message)
    }
}

type Action = Box<dyn FnOnce() -> AppResult<()> + Send + 'static>;

/// Observer fired once when a started unit finishes.
pub(crate) type CompletionHook = Box<dyn FnOnce(WorkId, Option<&WorkFailure>) + Send + 'static>;

struct WorkInner {
    id: WorkId,
    state: AtomicU8,
    /// Set once a scheduler (or `run_now`) takes ownership of starting the unit.
    claimed: AtomicBool,
    action: Mutex<Option<Action>>,
    hook: Mutex<Option<CompletionHook>>,
    outcome: Mutex<Option<Result<(), WorkFailure>>>,
    /// Flipped after the completion hook has returned.
    settled: Mutex<bool>,
    settled_cv: Condvar,
}

/// Handle to a single deferred callable.
///
/// Clones share the same underlying unit, so a caller can keep a handle to
/// observe state or wait for completion after submitting it.
#[derive(Clone)]
pub struct UnitOfWork {
    inner: Arc<WorkInner>,
}

impl UnitOfWork {
    /// Wrap an infallible action.
    #[must_use]
    pub fn new<F>(action: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self::fallible(move || {
            action();
            Ok(())
        })
    }

    /// Wrap an action whose error is routed to the scheduler's error sink.
    #[must_use]
    pub fn fallible<F>(action: F) -> Self
    where
        F: FnOnce() -> AppResult<()> + Send + 'static,
    {
        Self {
            inner: Arc::new(WorkInner {
                id: Uuid::new_v4(),
                state: AtomicU8::new(CREATED),
                claimed: AtomicBool::new(false),
                action: Mutex::new(Some(Box::new(action))),
                hook: Mutex::new(None),
                outcome: Mutex::new(None),
                settled: Mutex::new(false),
                settled_cv: Condvar::new(),
            }),
        }
    }

    /// Unique identifier of this unit.
    #[must_use]
    pub fn id(&self) -> WorkId {
        self.inner.id
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> WorkState {
        WorkState::from_raw(self.inner.state.load(Ordering::Acquire))
    }

    /// Whether the action has finished.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.state() == WorkState::Completed
    }

    /// Failure cause, once completed unsuccessfully.
    #[must_use]
    pub fn failure(&self) -> Option<WorkFailure> {
        self.inner
            .outcome
            .lock()
            .as_ref()
            .and_then(|outcome| outcome.as_ref().err().cloned())
    }

    /// Run the unit inline on the calling thread, bypassing any scheduler.
    ///
    /// # Errors
    ///
    /// Returns `ExecutorError::InvalidState` if the unit was already submitted,
    /// started or completed.
    pub fn run_now(&self) -> Result<(), ExecutorError> {
        self.claim()?;
        self.mark_started()?;
        self.run();
        Ok(())
    }

    /// Block until the unit has completed and its completion hook has run.
    ///
    /// Returns `false` if `timeout` elapsed first.
    #[must_use]
    ///
    /// A timeout too large to represent as a deadline waits without bound.
    pub fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut settled = self.inner.settled.lock();
        while !*settled {
            match deadline {
                Some(deadline) => {
                    if self
                        .inner
                        .settled_cv
                        .wait_until(&mut settled, deadline)
                        .timed_out()
                    {
                        return *settled;
                    }
                }
                None => self.inner.settled_cv.wait(&mut settled),
            }
        }
        true
    }

    /// Take exclusive ownership of starting this unit.
    pub(crate) fn claim(&self) -> Result<(), ExecutorError> {
        let state = self.state();
        if state != WorkState::Created {
            return Err(self.invalid(state, "only created units can be scheduled"));
        }
        if self.inner.claimed.swap(true, Ordering::AcqRel) {
            return Err(self.invalid(state, "unit has already been submitted"));
        }
        Ok(())
    }

    /// Attach the completion observer. Must happen before the unit is started.
    pub(crate) fn on_complete(&self, hook: CompletionHook) {
        *self.inner.hook.lock() = Some(hook);
    }

    /// Transition `Created -> Started`. Succeeds at most once per unit.
    pub(crate) fn mark_started(&self) -> Result<(), ExecutorError> {
        self.inner
            .state
            .compare_exchange(CREATED, STARTED, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|raw| self.invalid(WorkState::from_raw(raw), "unit was already started"))
    }

    /// Execute the action, record the outcome and fire the completion hook.
    ///
    /// Called by the substrate on whatever thread it runs work on. Panics in the
    /// action are captured as `WorkFailure::Panicked`.
    pub(crate) fn run(&self) {
        let action = self.inner.action.lock().take();
        let outcome = action.map_or(Ok(()), |action| {
            match catch_unwind(AssertUnwindSafe(action)) {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(WorkFailure::Errored(Arc::new(e))),
                Err(payload) => Err(WorkFailure::from_panic(payload.as_ref())),
            }
        });
        self.finish(outcome);
    }

    /// Complete a started unit whose job was discarded without running.
    pub(crate) fn abandon(&self) {
        drop(self.inner.action.lock().take());
        self.finish(Err(WorkFailure::Abandoned));
    }

    /// Record the outcome, fire the completion hook and wake waiters.
    fn finish(&self, outcome: Result<(), WorkFailure>) {
        let failure = outcome.as_ref().err().cloned();
        *self.inner.outcome.lock() = Some(outcome);
        self.inner.state.store(COMPLETED, Ordering::Release);

        let hook = self.inner.hook.lock().take();
        if let Some(hook) = hook {
            hook(self.inner.id, failure.as_ref());
        }

        let mut settled = self.inner.settled.lock();
        *settled = true;
        self.inner.settled_cv.notify_all();
    }

    fn invalid(&self, state: WorkState, reason: &'static str) -> ExecutorError {
        ExecutorError::InvalidState {
            id: self.inner.id,
            state,
            reason,
        }
    }
}

/// A started unit in transit to the substrate.
///
/// If the substrate drops the job instead of running it, the unit is completed
/// as [`WorkFailure::Abandoned`] so its completion hook still fires.
pub(crate) struct StartedUnit {
    unit: Option<UnitOfWork>,
}

impl StartedUnit {
    pub(crate) fn new(unit: UnitOfWork) -> Self {
        Self { unit: Some(unit) }
    }

    pub(crate) fn run(mut self) {
        if let Some(unit) = self.unit.take() {
            unit.run();
        }
    }
}

impl Drop for StartedUnit {
    fn drop(&mut self) {
        if let Some(unit) = self.unit.take() {
            warn!(unit_id = %unit.id(), "job dropped by substrate before it ran");
            unit.abandon();
        }
    }
}

impl fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("id", &self.inner.id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
