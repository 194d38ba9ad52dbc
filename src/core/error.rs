//! Error types for scheduler operations.

use thiserror::Error;

use super::work::{WorkId, WorkState};

/// Errors produced by scheduler components.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// The unit is not in `Created` state or has already been claimed by a scheduler.
    #[error("unit {id} is {state}: {reason}")]
    InvalidState {
        /// Identifier of the rejected unit.
        id: WorkId,
        /// State the unit was observed in.
        state: WorkState,
        /// Why the transition was refused.
        reason: &'static str,
    },
    /// Configuration values failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The execution substrate could not be created or refused the work.
    #[error("substrate error: {0}")]
    Substrate(String),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
