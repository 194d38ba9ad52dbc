//! Builder wiring configuration, substrate and error sink into a scheduler.

use std::sync::Arc;

use crate::config::{SchedulerConfig, SubstrateConfig};
use crate::core::{BoundedScheduler, ErrorSink, ExecutorError, Spawn, TracingErrorSink};
use crate::runtime::{ThreadPoolSpawner, ThreadSpawner};
#[cfg(feature = "tokio-runtime")]
use crate::runtime::TokioSpawner;

/// Substrate chosen at runtime from [`SubstrateConfig`].
pub enum ConfiguredSpawner {
    /// Thread per unit.
    Thread(ThreadSpawner),
    /// Fixed worker pool.
    ThreadPool(ThreadPoolSpawner),
    /// Tokio blocking pool.
    #[cfg(feature = "tokio-runtime")]
    Tokio(TokioSpawner),
}

impl ConfiguredSpawner {
    /// Create the substrate described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `ExecutorError::Substrate` if the pool cannot start or, for
    /// tokio, if no runtime is active (or the feature is disabled).
    pub fn from_config(config: &SchedulerConfig) -> Result<Self, ExecutorError> {
        match config.substrate {
            SubstrateConfig::Thread => Ok(Self::Thread(ThreadSpawner::new())),
            SubstrateConfig::ThreadPool => {
                ThreadPoolSpawner::new(config.worker_threads).map(Self::ThreadPool)
            }
            #[cfg(feature = "tokio-runtime")]
            SubstrateConfig::Tokio => TokioSpawner::try_current().map(Self::Tokio),
            #[cfg(not(feature = "tokio-runtime"))]
            SubstrateConfig::Tokio => Err(ExecutorError::Substrate(
                "tokio substrate requires the `tokio-runtime` feature".into(),
            )),
        }
    }
}

impl Spawn for ConfiguredSpawner {
    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        match self {
            Self::Thread(spawner) => spawner.spawn(job),
            Self::ThreadPool(spawner) => spawner.spawn(job),
            #[cfg(feature = "tokio-runtime")]
            Self::Tokio(spawner) => spawner.spawn(job),
        }
    }
}

/// Builds a [`BoundedScheduler`] from a [`SchedulerConfig`].
pub struct SchedulerBuilder {
    config: SchedulerConfig,
    sink: Option<Arc<dyn ErrorSink>>,
}

impl SchedulerBuilder {
    /// Start from an explicit configuration.
    #[must_use]
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config, sink: None }
    }

    /// Start from environment configuration (see [`SchedulerConfig::from_env`]).
    ///
    /// # Errors
    ///
    /// Returns `ExecutorError::InvalidConfig` if a variable is malformed or invalid.
    pub fn from_env() -> Result<Self, ExecutorError> {
        SchedulerConfig::from_env()
            .map(Self::new)
            .map_err(ExecutorError::InvalidConfig)
    }

    /// Configuration this builder will apply.
    #[must_use]
    pub const fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Route failures to `sink` instead of the default tracing sink.
    #[must_use]
    pub fn with_error_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Build a scheduler on a caller-supplied substrate.
    ///
    /// # Errors
    ///
    /// Returns `ExecutorError::InvalidConfig` if the configuration is invalid.
    pub fn build_with<S: Spawn>(self, spawner: S) -> Result<BoundedScheduler<S>, ExecutorError> {
        self.config
            .validate()
            .map_err(ExecutorError::InvalidConfig)?;
        let sink = self
            .sink
            .unwrap_or_else(|| Arc::new(TracingErrorSink) as Arc<dyn ErrorSink>);
        Ok(BoundedScheduler::new(self.config.capacity, spawner)
            .with_shutdown_timeout(self.config.shutdown_timeout())
            .with_error_sink(sink))
    }

    /// Build a scheduler on the substrate named by the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ExecutorError::InvalidConfig` for invalid configuration and
    /// `ExecutorError::Substrate` if the substrate cannot be created.
    pub fn build(self) -> Result<BoundedScheduler<ConfiguredSpawner>, ExecutorError> {
        let spawner = ConfiguredSpawner::from_config(&self.config)?;
        self.build_with(spawner)
    }
}
