//! Fixed-size worker thread pool substrate.
//!
//! Workers block on a crossbeam channel and run jobs in arrival order. Jobs the
//! scheduler hands over never outnumber its capacity (outside of a drain), so
//! sizing the pool at least as large as the capacity keeps admitted units from
//! waiting on a worker.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::core::{ExecutorError, Spawn};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Worker pool with dedicated OS threads.
///
/// # Design
///
/// - **No polling**: workers block on channel recv
/// - **Clean shutdown**: dropping the sender unblocks workers once the backlog is empty
/// - **Panic containment**: a panicking job is logged and the worker keeps serving
pub struct ThreadPoolSpawner {
    /// Job sender. Option allows clean shutdown by dropping.
    job_tx: Mutex<Option<Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    worker_count: usize,
}

impl ThreadPoolSpawner {
    /// Spawn `worker_count` worker threads.
    ///
    /// # Errors
    ///
    /// Returns `ExecutorError::InvalidConfig` for zero workers and
    /// `ExecutorError::Substrate` if a thread cannot be spawned.
    pub fn new(worker_count: usize) -> Result<Self, ExecutorError> {
        if worker_count == 0 {
            return Err(ExecutorError::InvalidConfig(
                "worker_count must be greater than 0".into(),
            ));
        }

        let (job_tx, job_rx) = unbounded::<Job>();
        let mut workers = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let worker = spawn_worker(worker_id, job_rx.clone())
                .map_err(|e| ExecutorError::Substrate(format!("spawn worker {worker_id}: {e}")))?;
            workers.push(worker);
        }

        info!(worker_count, "ThreadPoolSpawner initialized");

        Ok(Self {
            job_tx: Mutex::new(Some(job_tx)),
            workers: Mutex::new(workers),
            worker_count,
        })
    }

    /// Pool sized to the number of logical CPUs.
    ///
    /// # Errors
    ///
    /// See [`new`](Self::new).
    pub fn with_cpu_count() -> Result<Self, ExecutorError> {
        Self::new(num_cpus::get())
    }

    /// Number of worker threads.
    #[must_use]
    pub const fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Jobs accepted but not yet picked up by a worker.
    #[must_use]
    pub fn backlog(&self) -> usize {
        self.job_tx.lock().as_ref().map_or(0, Sender::len)
    }

    /// Stop accepting jobs, let workers finish the backlog and join them.
    ///
    /// Workers that do not exit before `timeout` are detached. Jobs spawned
    /// after shutdown run inline on the caller.
    pub fn shutdown(&self, timeout: Duration) {
        if self.job_tx.lock().take().is_none() {
            return;
        }
        info!("Shutting down thread pool");

        let deadline = Instant::now() + timeout;
        let mut workers = self.workers.lock();
        for (idx, worker) in workers.drain(..).enumerate() {
            // Join on a helper thread so the wait can be bounded.
            let (tx, rx) = mpsc::channel();
            let joiner = thread::spawn(move || {
                let _ = tx.send(worker.join().is_ok());
            });

            match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                Ok(true) => debug!(worker_id = idx, "Worker joined successfully"),
                Ok(false) => warn!(worker_id = idx, "Worker panicked"),
                Err(_) => {
                    warn!(worker_id = idx, "Worker did not exit within timeout - detaching");
                    continue;
                }
            }
            let _ = joiner.join();
        }
    }
}

impl Spawn for ThreadPoolSpawner {
    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        // Clone the sender out so no lock is held while a job may run inline.
        let job_tx = self.job_tx.lock().clone();
        let Some(job_tx) = job_tx else {
            warn!("thread pool shut down - running job inline");
            job();
            return;
        };
        if let Err(crossbeam_channel::SendError(job)) = job_tx.send(Box::new(job)) {
            warn!("thread pool channel closed - running job inline");
            job();
        }
    }
}

impl Drop for ThreadPoolSpawner {
    fn drop(&mut self) {
        // Drop the sender but DON'T join workers in Drop: the last reference may
        // be released from a worker thread itself.
        if self.job_tx.lock().take().is_some() {
            debug!("ThreadPoolSpawner dropped without explicit shutdown - workers will be detached");
        }
    }
}

fn spawn_worker(worker_id: usize, job_rx: Receiver<Job>) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("be-worker-{worker_id}"))
        .spawn(move || {
            debug!(worker_id, "Worker thread started");
            // When the sender is dropped and the backlog is empty, recv returns Err.
            while let Ok(job) = job_rx.recv() {
                if catch_unwind(AssertUnwindSafe(job)).is_err() {
                    warn!(worker_id, "job panicked on worker thread");
                }
            }
            debug!(worker_id, "Worker thread exiting");
        })
}
