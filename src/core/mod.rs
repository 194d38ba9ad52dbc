//! Core scheduling abstractions: units of work, admission and shutdown.

pub mod error;
pub mod gate;
pub mod pending;
pub mod scheduler;
pub mod sink;
pub mod work;

pub use error::{AppResult, ExecutorError};
pub use gate::AdmissionGate;
pub use pending::PendingQueue;
pub use scheduler::{
    BoundedScheduler, SchedulerStats, ShutdownOutcome, Spawn, DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use sink::{ErrorSink, FailureEvent, InMemoryErrorSink, TracingErrorSink};
pub use work::{UnitOfWork, WorkFailure, WorkId, WorkState};
