//! Scheduler configuration structures.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variable holding the concurrency capacity.
pub const ENV_CAPACITY: &str = "EXECUTOR_CAPACITY";
/// Environment variable holding the shutdown timeout in seconds.
pub const ENV_SHUTDOWN_TIMEOUT_SECS: &str = "EXECUTOR_SHUTDOWN_TIMEOUT_SECS";
/// Environment variable holding the worker thread count for the pool substrate.
pub const ENV_WORKER_THREADS: &str = "EXECUTOR_WORKER_THREADS";
/// Environment variable selecting the substrate (`thread`, `thread_pool`, `tokio`).
pub const ENV_SUBSTRATE: &str = "EXECUTOR_SUBSTRATE";

/// Execution substrate selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubstrateConfig {
    /// One OS thread per started unit.
    #[default]
    Thread,
    /// Fixed pool of `worker_threads` OS threads.
    ThreadPool,
    /// Blocking pool of the ambient tokio runtime.
    Tokio,
}

impl FromStr for SubstrateConfig {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "thread" => Ok(Self::Thread),
            "thread_pool" | "pool" => Ok(Self::ThreadPool),
            "tokio" => Ok(Self::Tokio),
            other => Err(format!("unknown substrate `{other}`")),
        }
    }
}

/// Scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Maximum concurrently running units.
    pub capacity: usize,
    /// How long `dispose` waits for started work, in seconds.
    pub shutdown_timeout_secs: u64,
    /// Worker threads for the thread pool substrate.
    pub worker_threads: usize,
    /// Substrate selection.
    pub substrate: SubstrateConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        let cpus = num_cpus::get();
        Self {
            capacity: cpus,
            shutdown_timeout_secs: 10,
            worker_threads: cpus,
            substrate: SubstrateConfig::default(),
        }
    }
}

impl SchedulerConfig {
    /// Defaults: capacity and workers equal to the CPU count, 10 second shutdown wait.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the concurrency capacity.
    #[must_use]
    pub const fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the shutdown timeout in seconds.
    #[must_use]
    pub const fn with_shutdown_timeout_secs(mut self, secs: u64) -> Self {
        self.shutdown_timeout_secs = secs;
        self
    }

    /// Set the worker thread count for the pool substrate.
    #[must_use]
    pub const fn with_worker_threads(mut self, worker_threads: usize) -> Self {
        self.worker_threads = worker_threads;
        self
    }

    /// Select the substrate.
    #[must_use]
    pub const fn with_substrate(mut self, substrate: SubstrateConfig) -> Self {
        self.substrate = substrate;
        self
    }

    /// Shutdown timeout as a `Duration`.
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.capacity == 0 {
            return Err("capacity must be greater than 0".into());
        }
        if self.shutdown_timeout_secs == 0 {
            return Err("shutdown_timeout_secs must be greater than 0".into());
        }
        if self.substrate == SubstrateConfig::ThreadPool && self.worker_threads == 0 {
            return Err("worker_threads must be greater than 0 for the thread pool".into());
        }
        Ok(())
    }

    /// Parse scheduler configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation message.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from the environment, loading a `.env` file if present.
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns a message naming the variable that failed to parse, or a validation error.
    pub fn from_env() -> Result<Self, String> {
        // A missing .env file is fine; variables may come from the process environment.
        let _ = dotenvy::dotenv();

        let mut cfg = Self::default();
        if let Some(capacity) = env_parse(ENV_CAPACITY)? {
            cfg.capacity = capacity;
        }
        if let Some(secs) = env_parse(ENV_SHUTDOWN_TIMEOUT_SECS)? {
            cfg.shutdown_timeout_secs = secs;
        }
        if let Some(workers) = env_parse(ENV_WORKER_THREADS)? {
            cfg.worker_threads = workers;
        }
        if let Some(substrate) = env_parse(ENV_SUBSTRATE)? {
            cfg.substrate = substrate;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn env_parse<T>(key: &str) -> Result<Option<T>, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| format!("{key}: {e}")),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(format!("{key}: {e}")),
    }
}
