//! Bounded scheduler: admission, completion-driven promotion and shutdown.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::error::{AppResult, ExecutorError};
use super::gate::AdmissionGate;
use super::pending::PendingQueue;
use super::sink::ErrorSink;
use super::work::{CompletionHook, StartedUnit, UnitOfWork, WorkFailure, WorkId};

/// How long `dispose` waits for started work before giving up.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Abstraction for the execution substrate that runs started units.
///
/// Implementations should eventually run every job they accept. A job dropped
/// without running completes its unit as [`WorkFailure::Abandoned`], which
/// still frees the slot.
pub trait Spawn: Send + Sync + 'static {
    /// Run `job` asynchronously with respect to the caller.
    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static;
}

/// Result of a shutdown request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownOutcome {
    /// Every started unit completed within the timeout.
    Drained {
        /// Units started by the drain, bypassing capacity.
        drained: usize,
    },
    /// The timeout elapsed with work still in flight; that work is abandoned.
    TimedOut {
        /// Units started by the drain, bypassing capacity.
        drained: usize,
        /// Units still running when the wait gave up.
        still_running: usize,
    },
    /// Another call already performed (or is performing) teardown.
    AlreadyDisposed,
}

impl ShutdownOutcome {
    /// Whether all work was observed to complete.
    #[must_use]
    pub const fn is_complete(self) -> bool {
        matches!(self, Self::Drained { .. })
    }
}

/// Statistics about scheduler utilization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    /// Configured capacity.
    pub capacity: usize,
    /// Units currently running.
    pub running: usize,
    /// Units waiting in the queue.
    pub pending: usize,
    /// Total units accepted by `submit`.
    pub submitted: u64,
    /// Total units handed to the substrate.
    pub started: u64,
    /// Total units that finished, successfully or not.
    pub completed: u64,
    /// Total units that finished with a failure.
    pub failed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    submitted: AtomicU64,
    started: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
}

/// State shared between the scheduler handle and completion hooks.
struct Shared<S> {
    gate: AdmissionGate,
    pending: PendingQueue,
    spawner: S,
    sink: Option<Arc<dyn ErrorSink>>,
    counters: Counters,
    disposed: AtomicBool,
    /// Paired with `idle`; signaled whenever the running count drops to zero.
    idle_lock: Mutex<()>,
    idle: Condvar,
}

impl<S: Spawn> Shared<S> {
    /// Build the completion observer for a unit. Holds only a weak reference so
    /// late completions after the scheduler is gone are ignored.
    fn completion_hook(this: &Arc<Self>) -> CompletionHook {
        let weak: Weak<Self> = Arc::downgrade(this);
        Box::new(move |id: WorkId, failure: Option<&WorkFailure>| {
            if let Some(shared) = weak.upgrade() {
                shared.on_unit_finished(id, failure);
            }
        })
    }

    /// Transition to `Started` and hand the unit to the substrate.
    /// The caller must already hold a running slot for it.
    fn start(&self, unit: UnitOfWork) {
        if let Err(e) = unit.mark_started() {
            warn!(unit_id = %unit.id(), error = %e, "refusing to start unit twice");
            self.release_slot();
            return;
        }
        self.counters.started.fetch_add(1, Ordering::Relaxed);
        debug!(unit_id = %unit.id(), running = self.gate.running(), "starting unit");
        let started = StartedUnit::new(unit);
        self.spawner.spawn(move || started.run());
    }

    fn on_unit_finished(&self, id: WorkId, failure: Option<&WorkFailure>) {
        self.counters.completed.fetch_add(1, Ordering::Relaxed);
        if failure.is_some() {
            self.counters.failed.fetch_add(1, Ordering::Relaxed);
        }

        let running = self.release_slot();
        debug!(unit_id = %id, running, "unit completed");

        if let Some(cause) = failure {
            self.report(id, cause);
        }

        self.promote();
    }

    /// Start queued units while slots are free, oldest first.
    fn promote(&self) {
        loop {
            if self.pending.is_empty() || !self.gate.try_acquire() {
                return;
            }
            if let Some(unit) = self.pending.pop() {
                debug!(unit_id = %unit.id(), "promoting queued unit");
                self.start(unit);
            } else {
                // Lost the race to another promoter; give the slot back and re-check.
                self.release_slot();
            }
        }
    }

    /// Start every queued unit regardless of capacity. Returns how many were started.
    fn drain(&self) -> usize {
        let units = self.pending.drain();
        let drained = units.len();
        for unit in units {
            self.gate.acquire_unchecked();
            self.start(unit);
        }
        drained
    }

    fn release_slot(&self) -> usize {
        let running = self.gate.release();
        if running == 0 {
            let _guard = self.idle_lock.lock();
            self.idle.notify_all();
        }
        running
    }

    fn report(&self, id: WorkId, cause: &WorkFailure) {
        let Some(sink) = &self.sink else {
            return;
        };
        if catch_unwind(AssertUnwindSafe(|| sink.report(id, cause))).is_err() {
            warn!(unit_id = %id, "error sink panicked while reporting a failure");
        }
    }

    /// Wait until nothing is running or `deadline` passes. Returns the running count left.
    /// No deadline waits without bound.
    fn wait_idle(&self, deadline: Option<Instant>) -> usize {
        let mut guard = self.idle_lock.lock();
        loop {
            if self.gate.running() == 0 {
                return 0;
            }
            match deadline {
                Some(deadline) => {
                    if self.idle.wait_until(&mut guard, deadline).timed_out() {
                        return self.gate.running();
                    }
                }
                None => self.idle.wait(&mut guard),
            }
        }
    }
}

/// Bounded-concurrency scheduler.
///
/// Runs at most `capacity` units at once on the substrate `S`; further units
/// wait in a FIFO queue and are promoted as running units complete.
///
/// # Design
///
/// - **Lock-free admission**: `AdmissionGate` reserves slots with a CAS loop
/// - **Brief queue locks**: the pending queue mutex is never held across `Spawn::spawn`
/// - **Completion-driven**: every completion releases a slot and promotes the next unit
/// - **Bounded shutdown**: `dispose` drains the queue and waits at most the shutdown timeout
pub struct BoundedScheduler<S: Spawn> {
    shared: Arc<Shared<S>>,
    shutdown_timeout: Duration,
}

impl<S: Spawn> BoundedScheduler<S> {
    /// Create a scheduler that runs at most `capacity` units concurrently on `spawner`.
    ///
    /// A capacity of zero is accepted: nothing runs until the scheduler is disposed.
    pub fn new(capacity: usize, spawner: S) -> Self {
        info!(capacity, "BoundedScheduler initialized");
        Self {
            shared: Arc::new(Shared {
                gate: AdmissionGate::new(capacity),
                pending: PendingQueue::new(),
                spawner,
                sink: None,
                counters: Counters::default(),
                disposed: AtomicBool::new(false),
                idle_lock: Mutex::new(()),
                idle: Condvar::new(),
            }),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    /// Attach an error sink that receives the cause of every failed unit.
    ///
    /// Takes effect only before the first submission; once units hold
    /// completion hooks the sink is fixed and a late call is ignored.
    #[must_use]
    pub fn with_error_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        if let Some(shared) = Arc::get_mut(&mut self.shared) {
            shared.sink = Some(sink);
        } else {
            warn!("error sink ignored: scheduler already has units in flight");
        }
        self
    }

    /// Override how long `dispose` waits for started work.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Submit a unit. Starts it immediately if a slot is free, otherwise queues it.
    ///
    /// Never blocks on work completion. After disposal, units are started
    /// immediately regardless of capacity so nothing is lost.
    ///
    /// # Errors
    ///
    /// Returns `ExecutorError::InvalidState` if the unit is not in `Created`
    /// state or has already been submitted.
    pub fn submit(&self, unit: UnitOfWork) -> Result<(), ExecutorError> {
        unit.claim()?;
        let shared = &self.shared;
        shared.counters.submitted.fetch_add(1, Ordering::Relaxed);
        unit.on_complete(Shared::completion_hook(shared));

        if shared.disposed.load(Ordering::Acquire) {
            debug!(unit_id = %unit.id(), "scheduler disposed, starting unit without admission");
            shared.gate.acquire_unchecked();
            shared.start(unit);
            return Ok(());
        }

        if shared.gate.try_acquire() {
            shared.start(unit);
            return Ok(());
        }

        debug!(
            unit_id = %unit.id(),
            capacity = shared.gate.capacity(),
            "capacity exhausted, unit queued"
        );
        shared.pending.push(unit);

        // A slot may have freed, or teardown begun, between the gate check and the push.
        if shared.disposed.load(Ordering::Acquire) {
            shared.drain();
        } else {
            shared.promote();
        }
        Ok(())
    }

    /// Wrap `action` in a new unit and submit it. Returns a handle to the unit.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`submit`](Self::submit); a fresh unit is never
    /// in an invalid state, so this only fails if submission itself fails.
    pub fn execute<F>(&self, action: F) -> Result<UnitOfWork, ExecutorError>
    where
        F: FnOnce() + Send + 'static,
    {
        let unit = UnitOfWork::new(action);
        self.submit(unit.clone())?;
        Ok(unit)
    }

    /// Like [`execute`](Self::execute) for actions that can fail; the error is
    /// routed to the error sink.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`submit`](Self::submit).
    pub fn execute_fallible<F>(&self, action: F) -> Result<UnitOfWork, ExecutorError>
    where
        F: FnOnce() -> AppResult<()> + Send + 'static,
    {
        let unit = UnitOfWork::fallible(action);
        self.submit(unit.clone())?;
        Ok(unit)
    }

    /// Units accepted but not yet completed: running plus queued.
    #[must_use]
    pub fn count(&self) -> usize {
        self.shared.gate.running() + self.shared.pending.len()
    }

    /// Units currently running.
    #[must_use]
    pub fn running(&self) -> usize {
        self.shared.gate.running()
    }

    /// Configured capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.shared.gate.capacity()
    }

    /// Configured shutdown timeout.
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    /// Snapshot of queued units in FIFO order.
    ///
    /// Advisory only: promotion runs concurrently, so the snapshot may be stale
    /// as soon as it is returned.
    #[must_use]
    pub fn pending(&self) -> Vec<UnitOfWork> {
        self.shared.pending.snapshot()
    }

    /// Whether teardown has begun.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.shared.disposed.load(Ordering::Acquire)
    }

    /// Get current scheduler statistics.
    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        let counters = &self.shared.counters;
        SchedulerStats {
            capacity: self.shared.gate.capacity(),
            running: self.shared.gate.running(),
            pending: self.shared.pending.len(),
            submitted: counters.submitted.load(Ordering::Relaxed),
            started: counters.started.load(Ordering::Relaxed),
            completed: counters.completed.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
        }
    }

    /// Drain the queue and wait for started work, up to the shutdown timeout.
    ///
    /// Idempotent: only the first call tears down; later or concurrent calls
    /// return `ShutdownOutcome::AlreadyDisposed` immediately.
    pub fn dispose(&self) -> ShutdownOutcome {
        self.dispose_with_timeout(self.shutdown_timeout)
    }

    /// [`dispose`](Self::dispose) with an explicit wait bound.
    ///
    /// A timeout too large to represent as a deadline waits without bound.
    pub fn dispose_with_timeout(&self, timeout: Duration) -> ShutdownOutcome {
        if self.shared.disposed.swap(true, Ordering::AcqRel) {
            return ShutdownOutcome::AlreadyDisposed;
        }

        let deadline = Instant::now().checked_add(timeout);
        info!(
            running = self.shared.gate.running(),
            pending = self.shared.pending.len(),
            "Disposing scheduler"
        );

        let drained = self.shared.drain();
        let still_running = self.shared.wait_idle(deadline);

        if still_running == 0 {
            info!(drained, "Scheduler disposed, all work completed");
            ShutdownOutcome::Drained { drained }
        } else {
            warn!(
                drained,
                still_running,
                timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                "Shutdown timeout elapsed with work still running - abandoning it"
            );
            ShutdownOutcome::TimedOut {
                drained,
                still_running,
            }
        }
    }
}

impl<S: Spawn> Drop for BoundedScheduler<S> {
    fn drop(&mut self) {
        // Start whatever is queued but DON'T wait in Drop.
        // Explicit dispose() is required for a bounded wait.
        if !self.shared.disposed.swap(true, Ordering::AcqRel) {
            let drained = self.shared.drain();
            debug!(
                drained,
                "BoundedScheduler dropped without explicit dispose - queued units started without waiting"
            );
        }
    }
}
