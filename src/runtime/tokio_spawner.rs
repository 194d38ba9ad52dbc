//! Tokio runtime spawner implementation.

use tokio::runtime::Handle;

use crate::core::{ExecutorError, Spawn};

/// Tokio-based spawner that runs units on the runtime's blocking thread pool.
///
/// Units are plain closures that may block, so they go through
/// `spawn_blocking` rather than onto the async worker threads.
#[derive(Debug, Clone)]
pub struct TokioSpawner {
    handle: Handle,
}

impl TokioSpawner {
    /// Create a `TokioSpawner` from a tokio runtime handle.
    #[must_use]
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Create a `TokioSpawner` for the runtime the caller is running on.
    ///
    /// # Errors
    ///
    /// Returns `ExecutorError::Substrate` when called outside a tokio runtime.
    pub fn try_current() -> Result<Self, ExecutorError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| ExecutorError::Substrate(e.to_string()))
    }
}

impl Spawn for TokioSpawner {
    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        // The join handle is not needed: completion is observed through the unit.
        // A runtime that is shutting down drops the job, which abandons the unit.
        drop(self.handle.spawn_blocking(job));
    }
}
