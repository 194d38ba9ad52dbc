//! Tests for error sinks

use bounded_executor::core::{ErrorSink, InMemoryErrorSink, UnitOfWork, WorkFailure};

#[test]
fn test_in_memory_sink_records_events() {
    let sink = InMemoryErrorSink::new(10);
    assert!(sink.is_empty());

    let unit = UnitOfWork::new(|| {});
    sink.report(unit.id(), &WorkFailure::Panicked("oops".into()));

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].unit_id, unit.id());
    assert!(events[0].reported_at_ms > 0);
}

#[test]
fn test_in_memory_sink_evicts_oldest() {
    let sink = InMemoryErrorSink::new(3);
    let units: Vec<_> = (0..5).map(|_| UnitOfWork::new(|| {})).collect();
    for unit in &units {
        sink.report(unit.id(), &WorkFailure::Panicked("x".into()));
    }

    let ids: Vec<_> = sink.events().iter().map(|e| e.unit_id).collect();
    let expected: Vec<_> = units[2..].iter().map(UnitOfWork::id).collect();
    assert_eq!(ids, expected);
}
