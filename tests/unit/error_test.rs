//! Tests for error types

use bounded_executor::core::{ExecutorError, UnitOfWork, WorkFailure, WorkState};
use std::sync::Arc;

#[test]
fn test_invalid_state_error() {
    let unit = UnitOfWork::new(|| {});
    let err = ExecutorError::InvalidState {
        id: unit.id(),
        state: WorkState::Started,
        reason: "unit was already started",
    };
    assert_eq!(
        format!("{err}"),
        format!("unit {} is started: unit was already started", unit.id())
    );
}

#[test]
fn test_invalid_config_error() {
    let err = ExecutorError::InvalidConfig("capacity must be greater than 0".to_string());
    assert_eq!(
        format!("{err}"),
        "invalid configuration: capacity must be greater than 0"
    );
}

#[test]
fn test_substrate_error() {
    let err = ExecutorError::Substrate("no runtime".to_string());
    assert_eq!(format!("{err}"), "substrate error: no runtime");
}

#[test]
fn test_work_failure_display() {
    let err = WorkFailure::Errored(Arc::new(anyhow::anyhow!("timeout talking to GPU")));
    assert_eq!(err.to_string(), "work returned an error: timeout talking to GPU");

    let err = WorkFailure::Panicked("index out of bounds".into());
    assert_eq!(err.to_string(), "work panicked: index out of bounds");

    assert_eq!(
        WorkFailure::Abandoned.to_string(),
        "work was dropped by the execution substrate before it ran"
    );
}
