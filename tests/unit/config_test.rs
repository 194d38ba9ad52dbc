//! Tests for configuration validation

use std::time::Duration;

use bounded_executor::config::{SchedulerConfig, SubstrateConfig};

#[test]
fn test_default_config_is_valid() {
    let cfg = SchedulerConfig::new();
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.shutdown_timeout(), Duration::from_secs(10));
    assert_eq!(cfg.substrate, SubstrateConfig::Thread);
    assert!(cfg.capacity > 0);
}

#[test]
fn test_invalid_capacity() {
    let cfg = SchedulerConfig::new().with_capacity(0);
    assert!(cfg.validate().is_err());
}

#[test]
fn test_invalid_shutdown_timeout() {
    let cfg = SchedulerConfig::new().with_shutdown_timeout_secs(0);
    assert!(cfg.validate().is_err());
}

#[test]
fn test_thread_pool_requires_workers() {
    let cfg = SchedulerConfig::new()
        .with_substrate(SubstrateConfig::ThreadPool)
        .with_worker_threads(0);
    assert!(cfg.validate().is_err());

    // Worker count is irrelevant for other substrates.
    let cfg = SchedulerConfig::new().with_worker_threads(0);
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_from_json_str() {
    let json = r#"{
        "capacity": 16,
        "shutdown_timeout_secs": 30,
        "worker_threads": 4,
        "substrate": "thread_pool"
    }"#;

    let cfg = SchedulerConfig::from_json_str(json).unwrap();
    assert_eq!(cfg.capacity, 16);
    assert_eq!(cfg.shutdown_timeout(), Duration::from_secs(30));
    assert_eq!(cfg.worker_threads, 4);
    assert_eq!(cfg.substrate, SubstrateConfig::ThreadPool);
}

#[test]
fn test_from_json_str_fills_defaults() {
    let cfg = SchedulerConfig::from_json_str(r#"{ "capacity": 2 }"#).unwrap();
    assert_eq!(cfg.capacity, 2);
    assert_eq!(cfg.shutdown_timeout_secs, 10);
}

#[test]
fn test_from_json_str_rejects_invalid() {
    assert!(SchedulerConfig::from_json_str(r#"{ "capacity": 0 }"#).is_err());
    assert!(SchedulerConfig::from_json_str("not json").is_err());
}

#[test]
fn test_config_round_trips_through_json() {
    let cfg = SchedulerConfig::new()
        .with_capacity(3)
        .with_substrate(SubstrateConfig::Tokio);
    let json = serde_json::to_string(&cfg).unwrap();
    assert!(json.contains("\"substrate\":\"tokio\""));
    assert_eq!(SchedulerConfig::from_json_str(&json).unwrap(), cfg);
}
