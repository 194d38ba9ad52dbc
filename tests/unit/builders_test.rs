//! Tests for builder modules

use std::sync::Arc;
use std::time::Duration;

use bounded_executor::builders::SchedulerBuilder;
use bounded_executor::config::{SchedulerConfig, SubstrateConfig};
use bounded_executor::core::{ExecutorError, InMemoryErrorSink};
use bounded_executor::runtime::ThreadSpawner;

#[test]
fn test_builder_applies_config() {
    let cfg = SchedulerConfig::new()
        .with_capacity(5)
        .with_shutdown_timeout_secs(3);
    let scheduler = SchedulerBuilder::new(cfg).build_with(ThreadSpawner::new()).unwrap();

    assert_eq!(scheduler.capacity(), 5);
    assert_eq!(scheduler.shutdown_timeout(), Duration::from_secs(3));
}

#[test]
fn test_builder_rejects_invalid_config() {
    let result = SchedulerBuilder::new(SchedulerConfig::new().with_capacity(0))
        .build_with(ThreadSpawner::new());
    assert!(matches!(result, Err(ExecutorError::InvalidConfig(_))));
}

#[test]
fn test_builder_thread_pool_substrate() {
    let sink = Arc::new(InMemoryErrorSink::new(4));
    let cfg = SchedulerConfig::new()
        .with_capacity(2)
        .with_worker_threads(2)
        .with_substrate(SubstrateConfig::ThreadPool);
    let scheduler = SchedulerBuilder::new(cfg)
        .with_error_sink(sink.clone())
        .build()
        .unwrap();

    let unit = scheduler
        .execute_fallible(|| Err(anyhow::anyhow!("rejected by backend")))
        .unwrap();
    assert!(unit.wait(Duration::from_secs(5)));
    assert_eq!(sink.len(), 1);
    assert!(scheduler.dispose().is_complete());
}

#[test]
fn test_builder_tokio_substrate_needs_runtime() {
    let cfg = SchedulerConfig::new().with_substrate(SubstrateConfig::Tokio);
    let result = SchedulerBuilder::new(cfg).build();
    assert!(matches!(result, Err(ExecutorError::Substrate(_))));
}

#[test]
fn test_build_rejects_invalid_config() {
    let result = SchedulerBuilder::new(SchedulerConfig::new().with_capacity(0)).build();
    assert!(matches!(result, Err(ExecutorError::InvalidConfig(_))));

    let cfg = SchedulerConfig::new()
        .with_substrate(SubstrateConfig::ThreadPool)
        .with_worker_threads(0);
    let result = SchedulerBuilder::new(cfg).build();
    assert!(matches!(result, Err(ExecutorError::InvalidConfig(_))));
}

#[test]
fn test_maximum_shutdown_timeout_still_drains() {
    let cfg = SchedulerConfig::from_json_str(
        r#"{ "capacity": 2, "shutdown_timeout_secs": 18446744073709551615 }"#,
    )
    .unwrap();
    let scheduler = SchedulerBuilder::new(cfg).build_with(ThreadSpawner::new()).unwrap();

    let units: Vec<_> = (0..5)
        .map(|_| scheduler.execute(|| {}).unwrap())
        .collect();
    assert!(scheduler.dispose().is_complete());
    assert!(units.iter().all(|unit| unit.is_completed()));
}
