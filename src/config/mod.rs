//! Configuration models for schedulers.

pub mod scheduler;

pub use scheduler::{SchedulerConfig, SubstrateConfig};
