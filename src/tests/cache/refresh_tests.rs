use futures::executor::{LocalPool, block_on};
use futures::task::LocalSpawnExt;
use serde_json::json;

use crate::cache::{FetchError, RecordCache};
use crate::domain::RecordId;
use crate::tests::support::{MemorySource, fields_of, fixture, record, RECORD};

#[test]
fn refresh_loads_and_clears_stale_flag() {
    let source = MemorySource::with_record(RECORD, json!({ "title": "server" }));
    let cache = RecordCache::new();
    cache.seed(record(), fields_of(json!({ "title": "local" })));
    cache.invalidate(&record());

    assert_eq!(block_on(cache.refresh(source.as_ref(), &record())), Ok(true));
    assert_eq!(cache.field(&record(), "title"), Some(json!("server")));
    assert!(!cache.is_stale(&record()));
    assert_eq!(source.fetches(), 1);
}

#[test]
fn missing_record_reports_not_found() {
    let source = MemorySource::with_record(RECORD, json!({}));
    let cache = RecordCache::new();
    let missing = RecordId::from("inc-404");

    assert_eq!(
        block_on(cache.refresh(source.as_ref(), &missing)),
        Err(FetchError::NotFound(missing.clone()))
    );
    assert_eq!(cache.reads_in_flight(&missing), 0);
}

#[test]
fn read_landing_mid_write_keeps_the_optimistic_key() {
    let (coordinator, writer) = fixture(json!({ "title": "t0", "status": "open" }));
    let gate = writer.gate("title");
    let cache = coordinator.cache().clone();
    let mut pool = LocalPool::new();

    let task = coordinator.clone();
    let save = pool
        .spawner()
        .spawn_local_with_handle(async move { task.apply(&record(), "title", json!("t1")).await })
        .unwrap();
    pool.run_until_stalled();

    let ticket = cache.begin_read(&record());
    let landed = cache.complete_read(ticket, fields_of(json!({ "title": "t0", "status": "triaged" })));

    assert!(landed);
    assert_eq!(cache.field(&record(), "title"), Some(json!("t1")));
    assert_eq!(cache.field(&record(), "status"), Some(json!("triaged")));

    gate.send(()).unwrap();
    pool.run_until(save).unwrap();
}

#[test]
fn every_operation_is_audited() {
    let (coordinator, _writer) = fixture(json!({ "title": "t0" }));
    block_on(coordinator.apply(&record(), "title", json!("t1"))).unwrap();

    let events = coordinator.cache().drain_audit();
    assert!(matches!(events.first(), Some(crate::cache::CacheEvent::Seeded { .. })));
    assert!(events
        .iter()
        .any(|event| matches!(event, crate::cache::CacheEvent::Invalidated { .. })));
    assert!(coordinator.cache().audit().is_empty());
}
