//! # Bounded Executor
//!
//! A bounded-concurrency task executor: it accepts units of deferred work and
//! runs at most `capacity` of them at once, parking the rest in a FIFO queue
//! until a running unit completes and frees its slot.
//!
//! ## Core Problem Solved
//!
//! Fire-and-forget work (cache refreshes, notifications, batch exports) is easy
//! to spawn and hard to throttle. Spawning everything at once overwhelms
//! downstream resources; blocking the caller defeats the point of deferring.
//! The executor sits between the two:
//!
//! - **Admission Control**: a lock-free running counter gates immediate starts
//! - **FIFO Parking**: overflow work waits in submission order, never blocking the caller
//! - **Completion-Driven Promotion**: each completion pulls the next queued unit
//! - **Bounded Shutdown**: `dispose` drains the queue and waits, at most a fixed timeout
//! - **Failure Isolation**: failing or panicking work is routed to an error sink
//!   and never stalls the queue
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use bounded_executor::core::{BoundedScheduler, TracingErrorSink};
//! use bounded_executor::runtime::ThreadSpawner;
//!
//! let scheduler = BoundedScheduler::new(4, ThreadSpawner::new())
//!     .with_error_sink(Arc::new(TracingErrorSink));
//!
//! for i in 0..16 {
//!     scheduler.execute(move || println!("job {i}"))?;
//! }
//!
//! // Starts whatever is still queued and waits up to 10 seconds.
//! let outcome = scheduler.dispose();
//! assert!(outcome.is_complete());
//! ```
//!
//! The execution substrate is pluggable through [`core::Spawn`]; see
//! [`runtime`] for thread, thread-pool and tokio backed implementations, and
//! [`builders::SchedulerBuilder`] to assemble one from configuration.

#![deny(warnings)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling abstractions: units of work, admission and shutdown.
pub mod core;
/// Configuration models for schedulers.
pub mod config;
/// Builders to construct schedulers from configuration.
#[cfg(not(target_arch = "wasm32"))]
pub mod builders;
/// Execution substrates that actually run started units.
pub mod runtime;
/// Shared utilities.
pub mod util;
