//! Integration tests for the rendezvous coordinator
//!
//! These tests drive the public API end to end on isolated instances, plus the
//! process-wide instance under `serial_test`.

use std::time::Duration;

use futures::FutureExt;
use rendezvous::{CoordinatorConfig, CoordinatorHandle, DoubleWaitPolicy, Waiter};
use serde_json::{Value, json};
use serial_test::serial;

fn coordinator() -> CoordinatorHandle {
    rendezvous::instance()
}

/// True if the waiter is still pending after giving the runtime a chance to run
async fn stays_pending(waiter: &mut Waiter<Value>) -> bool {
    tokio::time::timeout(Duration::from_millis(50), waiter).await.is_err()
}

// =============================================================================
// Tag Tests
// =============================================================================

#[tokio::test]
async fn test_wait_for_next_then_dispatch() {
    let coord = coordinator();
    let waiter = coord.wait_for_next("ready");

    coord.dispatch("ready", json!("V"));

    assert_eq!(waiter.await, json!("V"));
    assert_eq!(coord.pending("ready"), 0);
    assert!(!coord.inspect().is_active(&"ready".to_string()));
    assert!(!coord.has_value("ready"), "Resolved dispatch must not be cached");
}

#[tokio::test]
async fn test_waiter_resolves_across_tasks() {
    let coord = coordinator();
    let waiter = coord.wait_for_next("ready");
    let consumer = tokio::spawn(waiter);

    let producer = coord.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        producer.dispatch("ready", json!({"port": 8080}));
    });

    let value = tokio::time::timeout(Duration::from_secs(5), consumer)
        .await
        .expect("Waiter should resolve")
        .expect("Consumer task should not panic");
    assert_eq!(value["port"], 8080);
}

#[tokio::test]
async fn test_dispatch_before_wait_for_any_is_cached() {
    let coord = coordinator();
    coord.dispatch("config", json!(7));

    let first = coord.wait_for_any("config");
    assert_eq!(first.now_or_never(), Some(json!(7)), "Cached value resolves immediately");

    let mut second = coord.wait_for_any("config");
    assert!(stays_pending(&mut second).await, "Cache is consumed by the first read");
    assert_eq!(coord.pending("config"), 1);
}

#[tokio::test]
async fn test_wait_for_any_order_independence() {
    let coord = coordinator();

    coord.dispatch("early", json!("V"));
    let early = coord.wait_for_any("early").await;

    let late_waiter = coord.wait_for_any("late");
    coord.dispatch("late", json!("V"));
    let late = late_waiter.await;

    assert_eq!(early, late);
}

#[tokio::test]
async fn test_later_dispatch_overwrites_cached_value() {
    let coord = coordinator();
    coord.dispatch("config", json!(1));
    coord.dispatch("config", json!(2));

    assert_eq!(coord.wait_for_any("config").await, json!(2));
}

#[tokio::test]
async fn test_wait_for_next_ignores_cache() {
    let coord = coordinator();
    coord.dispatch("config", json!("stale"));

    let mut waiter = coord.wait_for_next("config");
    assert!(stays_pending(&mut waiter).await);

    coord.dispatch("config", json!("fresh"));
    assert_eq!(waiter.await, json!("fresh"));
    assert_eq!(coord.wait_for_any("config").await, json!("stale"));
}

#[tokio::test]
async fn test_double_wait_overwrites_by_default() {
    let coord = coordinator();
    let mut first = coord.wait_for_next("ready");
    let second = coord.wait_for_next("ready");

    coord.dispatch("ready", json!(1));

    assert_eq!(second.await, json!(1));
    assert!(stays_pending(&mut first).await, "Overwritten waiter never resolves");
    assert_eq!(coord.metrics().waiters_overwritten, 1);
}

#[tokio::test]
async fn test_double_wait_queue_policy() {
    let coord: CoordinatorHandle =
        CoordinatorHandle::new(CoordinatorConfig::default().with_double_wait(DoubleWaitPolicy::Queue));
    let first = coord.wait_for_next("ready");
    let second = coord.wait_for_next("ready");

    coord.dispatch("ready", json!(1));
    coord.dispatch("ready", json!(2));
    coord.dispatch("ready", json!(3));

    assert_eq!(first.await, json!(1));
    assert_eq!(second.await, json!(2));
    assert!(coord.has_value("ready"), "Third dispatch has no waiter left");
}

#[tokio::test]
async fn test_overwritten_waiter_reports_abandoned() {
    let coord = coordinator();
    let first = coord.wait_for_next("ready");
    let _second = coord.wait_for_next("ready");

    let err = first.into_result().await.unwrap_err();
    assert!(err.is_abandoned());
}

// =============================================================================
// Group Tests
// =============================================================================

#[tokio::test]
async fn test_friends_group_scenario() {
    let coord = coordinator();
    let members: Vec<_> = (1..=5)
        .map(|id| {
            let waiter = coord.wait_for_group("friends");
            assert_eq!(waiter.position(), Some(id));
            tokio::spawn(async move { (id, waiter.await) })
        })
        .collect();

    coord.dispatch_group("friends", json!("go"));

    let mut resolved = Vec::new();
    for member in members {
        let (id, value) = member.await.unwrap();
        assert_eq!(value, json!("go"));
        resolved.push(id);
    }
    assert_eq!(resolved, vec![1, 2, 3, 4, 5]);
    assert!(coord.inspect().pooled.is_empty());
}

#[tokio::test]
async fn test_second_group_dispatch_is_noop() {
    let coord = coordinator();
    let waiters: Vec<_> = (0..3).map(|_| coord.wait_for_group("g")).collect();

    coord.dispatch_group("g", json!("V"));
    coord.dispatch_group("g", json!("V2"));

    for waiter in waiters {
        assert_eq!(waiter.await, json!("V"));
    }
    let metrics = coord.metrics();
    assert_eq!(metrics.group_dispatches, 2);
    assert_eq!(metrics.empty_group_dispatches, 1);
    assert_eq!(metrics.members_resolved, 3);
}

#[tokio::test]
async fn test_silenced_warnings_keep_behavior_and_metrics() {
    let quiet_config = CoordinatorConfig {
        warn_on_overwrite: false,
        warn_on_empty_group: false,
        ..CoordinatorConfig::default()
    };
    let quiet: CoordinatorHandle = CoordinatorHandle::new(quiet_config);
    let loud = coordinator();

    for coord in [&quiet, &loud] {
        let mut first = coord.wait_for_next("ready");
        let second = coord.wait_for_next("ready");
        coord.dispatch("ready", json!(1));
        assert_eq!(second.await, json!(1));
        assert!(stays_pending(&mut first).await);

        let member = coord.wait_for_group("g");
        coord.dispatch_group("g", json!("V"));
        coord.dispatch_group("g", json!("V2"));
        assert_eq!(member.await, json!("V"));
        assert!(coord.inspect().is_empty());
    }

    let metrics = quiet.metrics();
    assert_eq!(metrics.waiters_overwritten, 1);
    assert_eq!(metrics.empty_group_dispatches, 1);
    assert_eq!(metrics, loud.metrics());
}

#[tokio::test]
async fn test_rejoin_after_dispatch_starts_new_group() {
    let coord = coordinator();
    let first = coord.wait_for_group("g");
    coord.dispatch_group("g", json!(1));

    let second = coord.wait_for_group("g");
    assert_eq!(second.position(), Some(1));
    coord.dispatch_group("g", json!(2));

    assert_eq!(first.await, json!(1));
    assert_eq!(second.await, json!(2));
}

#[tokio::test]
async fn test_dispatch_to_unknown_group_changes_nothing() {
    let coord = coordinator();
    let _waiter = coord.wait_for_next("ready");
    let _member = coord.wait_for_group("friends");
    coord.dispatch("config", json!(1));
    let before = coord.snapshot();

    coord.dispatch_group("nonexistent", json!("V"));

    let after = coord.snapshot();
    assert_eq!(before.active, after.active);
    assert_eq!(before.values, after.values);
    assert_eq!(before.pooled, after.pooled);
    assert!(!coord.has_value("nonexistent"), "Group dispatches are never cached");
}

// =============================================================================
// Purge / Remove Tests
// =============================================================================

#[tokio::test]
async fn test_purge_clears_everything() {
    let coord = coordinator();
    let mut waiter = coord.wait_for_next("ready");
    let mut member = coord.wait_for_group("friends");
    coord.dispatch("config", json!(1));
    assert!(!coord.inspect().is_empty());

    coord.purge();

    let snapshot = coord.inspect();
    assert!(snapshot.active.is_empty());
    assert!(snapshot.values.is_empty());
    assert!(snapshot.pooled.is_empty());

    // Dispatching after the purge reaches nobody from before it
    coord.dispatch("ready", json!(2));
    coord.dispatch_group("friends", json!(3));
    assert!(stays_pending(&mut waiter).await);
    assert!(stays_pending(&mut member).await);
}

#[tokio::test]
async fn test_remove_is_scoped() {
    let coord = coordinator();
    let _t = coord.wait_for_next("t");
    coord.dispatch("cached-t", json!(0));
    let _other = coord.wait_for_next("other");
    let _member = coord.wait_for_group("t");
    let _friends = coord.wait_for_group("friends");
    coord.dispatch("kept", json!(1));

    coord.remove("t");

    assert_eq!(coord.pending("t"), 0);
    assert_eq!(coord.members("t"), 0);
    assert_eq!(coord.pending("other"), 1);
    assert_eq!(coord.members("friends"), 1);
    assert!(coord.has_value("kept"));
    assert!(coord.has_value("cached-t"));

    coord.remove("cached-t");
    assert!(!coord.has_value("cached-t"));
    assert!(coord.has_value("kept"));
}

#[tokio::test]
async fn test_dropped_waiter_leaves_value_cached() {
    let coord = coordinator();
    drop(coord.wait_for_next("ready"));

    coord.dispatch("ready", json!(1));

    assert!(coord.has_value("ready"));
    assert_eq!(coord.wait_for_any("ready").await, json!(1));
}

// =============================================================================
// Global Instance Tests
// =============================================================================

#[tokio::test]
#[serial]
async fn test_global_is_shared() {
    let global = rendezvous::global();
    global.purge();

    let waiter = rendezvous::global().wait_for_next("global-ready");
    global.dispatch("global-ready", json!("shared"));
    assert_eq!(waiter.await, json!("shared"));

    global.purge();
}

#[tokio::test]
#[serial]
async fn test_instance_is_isolated_from_global() {
    let global = rendezvous::global();
    global.purge();

    let local = coordinator();
    local.dispatch("isolated", json!(1));

    assert!(local.has_value("isolated"));
    assert!(!global.has_value("isolated"));
}
