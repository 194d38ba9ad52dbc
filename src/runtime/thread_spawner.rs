//! Thread-per-unit substrate.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use tracing::error;

use crate::core::Spawn;

/// Spawner that runs every job on a fresh, named OS thread.
///
/// Suited to blocking work: the scheduler's capacity is the only bound on how
/// many threads exist at once (plus whatever `dispose` drains).
#[derive(Debug, Clone)]
pub struct ThreadSpawner {
    name_prefix: Arc<str>,
    stack_size: Option<usize>,
    spawned: Arc<AtomicU64>,
}

impl Default for ThreadSpawner {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreadSpawner {
    /// Create a spawner naming threads `be-unit-<n>`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            name_prefix: Arc::from("be-unit"),
            stack_size: None,
            spawned: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Use a custom thread name prefix.
    #[must_use]
    pub fn with_name_prefix(mut self, prefix: &str) -> Self {
        self.name_prefix = Arc::from(prefix);
        self
    }

    /// Set the stack size for spawned threads, in bytes.
    #[must_use]
    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    /// Number of jobs handed to this spawner (shared across clones).
    #[must_use]
    pub fn spawned(&self) -> u64 {
        self.spawned.load(Ordering::Relaxed)
    }
}

impl Spawn for ThreadSpawner {
    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let seq = self.spawned.fetch_add(1, Ordering::Relaxed);
        let mut builder = thread::Builder::new().name(format!("{}-{seq}", self.name_prefix));
        if let Some(bytes) = self.stack_size {
            builder = builder.stack_size(bytes);
        }

        // Keep the job reachable if the OS refuses the thread, so it still runs.
        let slot = Arc::new(Mutex::new(Some(job)));
        let thread_slot = Arc::clone(&slot);
        let spawned = builder.spawn(move || {
            let job = thread_slot.lock().take();
            if let Some(job) = job {
                job();
            }
        });

        if let Err(e) = spawned {
            error!(error = %e, "failed to spawn unit thread - running job inline");
            let job = slot.lock().take();
            if let Some(job) = job {
                job();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_runs_on_named_thread() {
        let spawner = ThreadSpawner::new().with_name_prefix("test-unit");
        let (tx, rx) = mpsc::channel();
        spawner.spawn(move || {
            let name = thread::current().name().map(ToString::to_string);
            tx.send(name).unwrap();
        });

        let name = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(name.as_deref(), Some("test-unit-0"));
        assert_eq!(spawner.spawned(), 1);
    }
}
