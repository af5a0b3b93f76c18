use futures::channel::oneshot;
use futures::executor::LocalPool;
use futures::future::RemoteHandle;
use futures::task::LocalSpawnExt;
use serde_json::{Value, json};

use crate::cache::CacheEvent;
use crate::mutation::{MutationCoordinator, WriteError};
use crate::tests::support::{Reply, fields_of, fixture, record};

#[test]
fn concurrent_keys_survive_out_of_order_completion() {
    let (coordinator, writer) = fixture(json!({ "title": "t0", "status": "open", "owner": "amy" }));
    let gate_a = writer.gate("title");
    let gate_b = writer.gate("status");
    let mut pool = LocalPool::new();
    let spawner = pool.spawner();

    let a = coordinator.clone();
    let save_a = spawner
        .spawn_local_with_handle(async move { a.apply(&record(), "title", json!("t1")).await })
        .unwrap();
    let b = coordinator.clone();
    let save_b = spawner
        .spawn_local_with_handle(async move { b.apply(&record(), "status", json!("resolved")).await })
        .unwrap();
    pool.run_until_stalled();
    assert_eq!(coordinator.in_flight(&record()), 2);

    gate_b.send(()).unwrap();
    assert_eq!(pool.run_until(save_b), Ok(json!("resolved")));
    gate_a.send(()).unwrap();
    assert_eq!(pool.run_until(save_a), Ok(json!("t1")));

    let cache = coordinator.cache();
    assert_eq!(
        cache.get(&record()).unwrap(),
        fields_of(json!({ "title": "t1", "status": "resolved", "owner": "amy" }))
    );
    assert_eq!(coordinator.in_flight(&record()), 0);
    assert!(cache.is_stale(&record()));
    assert!(!cache.has_pending(&record()));
}

#[test]
fn failure_rolls_back_only_its_own_key() {
    let (coordinator, writer) = fixture(json!({ "title": "t0", "status": "open" }));
    writer.reply("status", Reply::Reject("invalid transition".into()));
    let gate_title = writer.gate("title");
    let mut pool = LocalPool::new();
    let spawner = pool.spawner();

    let a = coordinator.clone();
    let save_title = spawner
        .spawn_local_with_handle(async move { a.apply(&record(), "title", json!("t1")).await })
        .unwrap();
    pool.run_until_stalled();

    let status = pool.run_until(coordinator.apply(&record(), "status", json!("closed")));
    assert_eq!(status, Err(WriteError::rejected("invalid transition")));
    assert_eq!(coordinator.cache().field(&record(), "status"), Some(json!("open")));
    assert_eq!(coordinator.cache().field(&record(), "title"), Some(json!("t1")));

    gate_title.send(()).unwrap();
    assert!(pool.run_until(save_title).is_ok());
}

#[test]
fn older_failure_does_not_clobber_newer_write() {
    let (coordinator, writer) = fixture(json!({ "title": "t0" }));
    let gate_first = writer.gate("title");
    let mut pool = LocalPool::new();
    let spawner = pool.spawner();

    let first_coordinator = coordinator.clone();
    writer.reply("title", Reply::Reject("stale".into()));
    let first = spawner
        .spawn_local_with_handle(async move {
            first_coordinator.apply(&record(), "title", json!("one")).await
        })
        .unwrap();
    pool.run_until_stalled();

    writer.reply("title", Reply::Echo);
    let second = pool.run_until(coordinator.apply(&record(), "title", json!("two")));
    assert_eq!(second, Ok(json!("two")));

    gate_first.send(()).unwrap();
    // The first write's reply was captured when it was dispatched.
    assert!(pool.run_until(first).is_err());
    assert_eq!(coordinator.cache().field(&record(), "title"), Some(json!("two")));
    assert!(coordinator.cache().audit().iter().any(|event| matches!(
        event,
        CacheEvent::RestoreSkipped { key, .. } if key == "title"
    )));
}

#[test]
fn rollback_of_new_key_removes_it() {
    let (coordinator, writer) = fixture(json!({ "title": "t0" }));
    writer.reply("due", Reply::Reject("nope".into()));
    let before = coordinator.cache().get(&record()).unwrap();

    let result = futures::executor::block_on(coordinator.apply(&record(), "due", json!("2024-01-01T00:00")));

    assert!(result.is_err());
    assert_eq!(coordinator.cache().get(&record()).unwrap(), before);
}

#[test]
fn write_cancels_outstanding_reads() {
    let (coordinator, _writer) = fixture(json!({ "title": "t0" }));
    let cache = coordinator.cache().clone();
    let ticket = cache.begin_read(&record());

    futures::executor::block_on(coordinator.apply(&record(), "title", json!("t1"))).unwrap();

    assert!(!cache.complete_read(ticket, fields_of(json!({ "title": "t0" }))));
    assert_eq!(cache.field(&record(), "title"), Some(json!("t1")));
}

#[test]
fn dropped_write_future_still_settles() {
    let (coordinator, writer) = fixture(json!({ "title": "t0" }));
    let _gate = writer.gate("title");
    {
        let mut pool = LocalPool::new();
        let task = coordinator.clone();
        pool.spawner()
            .spawn_local(async move {
                let _ = task.apply(&record(), "title", json!("t1")).await;
            })
            .unwrap();
        pool.run_until_stalled();
        assert_eq!(coordinator.in_flight(&record()), 1);
    }
    assert_eq!(coordinator.in_flight(&record()), 0);
    assert!(!coordinator.cache().has_pending(&record()));
    assert!(coordinator.cache().is_stale(&record()));
}

type Save = RemoteHandle<Result<Value, WriteError>>;

/// Two gated writes to `title` ("one" then "two") over a seeded "t0".
fn overlapping_title_writes(
    first: Reply,
    second: Reply,
) -> (MutationCoordinator, LocalPool, [oneshot::Sender<()>; 2], [Save; 2]) {
    let (coordinator, writer) = fixture(json!({ "title": "t0" }));
    let gates = [writer.gate("title"), writer.gate("title")];
    let mut pool = LocalPool::new();
    let spawner = pool.spawner();

    writer.reply("title", first);
    let a = coordinator.clone();
    let one = spawner
        .spawn_local_with_handle(async move { a.apply(&record(), "title", json!("one")).await })
        .unwrap();
    pool.run_until_stalled();

    writer.reply("title", second);
    let b = coordinator.clone();
    let two = spawner
        .spawn_local_with_handle(async move { b.apply(&record(), "title", json!("two")).await })
        .unwrap();
    pool.run_until_stalled();
    assert_eq!(coordinator.cache().field(&record(), "title"), Some(json!("two")));

    (coordinator, pool, gates, [one, two])
}

#[test]
fn both_overlapping_failures_restore_the_confirmed_value_newest_first() {
    let (coordinator, mut pool, [gate_one, gate_two], [one, two]) = overlapping_title_writes(
        Reply::Reject("rejected one".into()),
        Reply::Reject("rejected two".into()),
    );

    gate_two.send(()).unwrap();
    assert!(pool.run_until(two).is_err());
    // "one" is still in flight, so it is what the key shows meanwhile.
    assert_eq!(coordinator.cache().field(&record(), "title"), Some(json!("one")));

    gate_one.send(()).unwrap();
    assert!(pool.run_until(one).is_err());
    assert_eq!(coordinator.cache().field(&record(), "title"), Some(json!("t0")));
    assert!(!coordinator.cache().has_pending(&record()));
}

#[test]
fn both_overlapping_failures_restore_the_confirmed_value_oldest_first() {
    let (coordinator, mut pool, [gate_one, gate_two], [one, two]) = overlapping_title_writes(
        Reply::Reject("rejected one".into()),
        Reply::Reject("rejected two".into()),
    );

    gate_one.send(()).unwrap();
    assert!(pool.run_until(one).is_err());
    assert_eq!(coordinator.cache().field(&record(), "title"), Some(json!("two")));

    gate_two.send(()).unwrap();
    assert!(pool.run_until(two).is_err());
    assert_eq!(coordinator.cache().field(&record(), "title"), Some(json!("t0")));
}

#[test]
fn newer_failure_falls_back_to_older_confirmed_write() {
    let (coordinator, mut pool, [gate_one, gate_two], [one, two]) =
        overlapping_title_writes(Reply::Echo, Reply::Reject("rejected two".into()));

    gate_one.send(()).unwrap();
    assert_eq!(pool.run_until(one), Ok(json!("one")));
    assert_eq!(coordinator.cache().field(&record(), "title"), Some(json!("two")));

    gate_two.send(()).unwrap();
    assert!(pool.run_until(two).is_err());
    assert_eq!(coordinator.cache().field(&record(), "title"), Some(json!("one")));
}
