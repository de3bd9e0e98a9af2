//! Integration tests for the caching secret manager
//!
//! These tests drive the public manager contract with a scripted source and
//! a fake clock: reference counting across pods, TTL-bounded refresh,
//! fetch coalescing under concurrency and the version-skew guard.

mod common;

use common::{caching_manager, pod, value_of, ScriptedSource};
use proptest::prelude::*;
use secret_cache::config::{CacheConfig, ManagerMode};
use secret_cache::domain::ObjectKey;
use secret_cache::secrets::{new_secret_manager, SecretManager};
use secret_cache::SecretCacheError;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use tokio::time::timeout;
use tokio_test::assert_ok;

#[tokio::test]
async fn test_scenario_ttl_refresh() {
    let source = ScriptedSource::new();
    source.push_secret("ns", "s1", 1);
    source.push_secret("ns", "s1", 2);
    let (manager, clock) = caching_manager(source.clone());

    manager.register_pod(&pod("a", &["s1"]));

    let first = manager.get_secret("ns", "s1").await.unwrap();
    assert_eq!(value_of(&first), "s1-v1");
    assert_eq!(source.calls(), 1);

    clock.advance(chrono::Duration::seconds(30));
    let cached = manager.get_secret("ns", "s1").await.unwrap();
    assert_eq!(value_of(&cached), "s1-v1");
    assert_eq!(source.calls(), 1);

    clock.advance(chrono::Duration::seconds(31));
    let refreshed = manager.get_secret("ns", "s1").await.unwrap();
    assert_eq!(value_of(&refreshed), "s1-v2");
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn test_scenario_not_found_cached() {
    let source = ScriptedSource::new();
    source.push("ns", "s1", Err(SecretCacheError::not_found("ns", "s1")));
    let (manager, clock) = caching_manager(source.clone());
    manager.register_pod(&pod("a", &["s1"]));

    for _ in 0..3 {
        let err = manager.get_secret("ns", "s1").await.unwrap_err();
        assert_eq!(err, SecretCacheError::not_found("ns", "s1"));
    }
    assert_eq!(source.calls(), 1);

    clock.advance(chrono::Duration::seconds(60));
    assert!(manager.get_secret("ns", "s1").await.unwrap_err().is_not_found());
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn test_shared_key_evicted_only_after_last_pod() {
    let source = ScriptedSource::new();
    source.push_secret("ns", "shared", 1);
    let (manager, _) = caching_manager(source.clone());
    let a = pod("a", &["shared"]);
    let b = pod("b", &["shared"]);

    manager.register_pod(&a);
    manager.register_pod(&b);
    manager.get_secret("ns", "shared").await.unwrap();

    manager.unregister_pod(&a);
    assert_eq!(manager.ref_count("ns", "shared"), 1);
    manager.get_secret("ns", "shared").await.unwrap();
    assert_eq!(source.calls(), 1);

    manager.unregister_pod(&b);
    let err = manager.get_secret("ns", "shared").await.unwrap_err();
    assert!(err.is_not_registered());
    assert!(manager.store().is_empty());
}

#[tokio::test]
async fn test_reregistration_with_changed_references() {
    let source = ScriptedSource::new();
    let (manager, _) = caching_manager(source.clone());

    manager.register_pod(&pod("a", &["s1", "s2"]));
    manager.register_pod(&pod("b", &["s2"]));
    assert_eq!(manager.ref_count("ns", "s2"), 2);

    manager.register_pod(&pod("a", &["s2", "s3"]));
    assert_eq!(manager.ref_count("ns", "s1"), 0);
    assert_eq!(manager.ref_count("ns", "s2"), 2);
    assert_eq!(manager.ref_count("ns", "s3"), 1);
    assert!(!manager.store().contains(&ObjectKey::new("ns", "s1")));
    assert_eq!(manager.registered_pod_count(), 2);
}

#[tokio::test]
async fn test_pod_update_invalidates_retained_keys() {
    let source = ScriptedSource::new();
    source.push_secret("ns", "s1", 1);
    source.push_secret("ns", "s1", 2);
    let (manager, _) = caching_manager(source.clone());
    let a = pod("a", &["s1"]);

    manager.register_pod(&a);
    assert_eq!(manager.get_secret("ns", "s1").await.unwrap().version(), 1);

    // An update of the pod must not be answered from the earlier snapshot.
    manager.register_pod(&a);
    assert_eq!(manager.get_secret("ns", "s1").await.unwrap().version(), 2);
    assert_eq!(manager.ref_count("ns", "s1"), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reads_share_one_fetch() {
    let source = ScriptedSource::new();
    source.push_secret("ns", "s1", 1);
    let (manager, _) = caching_manager(source.clone());
    manager.register_pod(&pod("a", &["s1"]));

    let gate = source.close_gate();
    let mut handles = Vec::new();
    for _ in 0..8 {
        let manager = manager.clone();
        handles.push(tokio::spawn(async move { manager.get_secret("ns", "s1").await }));
    }

    while source.calls() == 0 {
        tokio::task::yield_now().await;
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    gate.add_permits(1);

    for handle in handles {
        let secret = handle.await.unwrap().unwrap();
        assert_eq!(value_of(&secret), "s1-v1");
    }
    assert_eq!(source.calls(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_slow_fetch_does_not_block_other_keys() {
    let source = ScriptedSource::new();
    source.push_secret("ns", "fast", 1);
    source.push_secret("ns", "slow", 1);
    let (manager, _) = caching_manager(source.clone());
    manager.register_pod(&pod("a", &["fast", "slow"]));
    manager.get_secret("ns", "fast").await.unwrap();

    let gate = source.close_gate();
    let slow = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.get_secret("ns", "slow").await })
    };
    while source.calls() < 2 {
        tokio::task::yield_now().await;
    }

    // Registration and reads of other keys proceed while "slow" is in flight.
    manager.register_pod(&pod("b", &["other"]));
    let fast = timeout(Duration::from_secs(1), manager.get_secret("ns", "fast")).await;
    assert!(fast.expect("read of a cached key blocked on another key's fetch").is_ok());

    gate.add_permits(1);
    assert_ok!(slow.await.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_registration_during_fetch_forces_refetch() {
    let source = ScriptedSource::new();
    source.push_secret("ns", "s1", 1);
    source.push_secret("ns", "s1", 2);
    let (manager, _) = caching_manager(source.clone());
    manager.register_pod(&pod("a", &["s1"]));

    let gate = source.close_gate();
    let in_flight = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.get_secret("ns", "s1").await })
    };
    while source.calls() == 0 {
        tokio::task::yield_now().await;
    }

    // Lands while the first fetch is still waiting on the gate.
    manager.register_pod(&pod("b", &["s1"]));
    assert_eq!(manager.ref_count("ns", "s1"), 2);

    gate.add_permits(1);
    assert_eq!(in_flight.await.unwrap().unwrap().version(), 1);

    // The registration dropped the snapshot the in-flight read filled.
    assert_eq!(manager.get_secret("ns", "s1").await.unwrap().version(), 2);
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn test_out_of_order_completion_keeps_newer_value() {
    let source = ScriptedSource::new();
    source.push_secret("ns", "s1", 7);
    source.push_secret("ns", "s1", 6);
    let (manager, clock) = caching_manager(source.clone());
    manager.register_pod(&pod("a", &["s1"]));

    assert_eq!(manager.get_secret("ns", "s1").await.unwrap().version(), 7);

    clock.advance(chrono::Duration::seconds(61));
    let served = manager.get_secret("ns", "s1").await.unwrap();
    assert_eq!(served.version(), 7);
    assert_eq!(value_of(&served), "s1-v7");
}

#[tokio::test]
async fn test_transient_errors() {
    let source = ScriptedSource::new();
    source.push("ns", "s1", Err(SecretCacheError::fetch("ns", "s1", "unavailable")));
    source.push_secret("ns", "s1", 1);
    source.push("ns", "s1", Err(SecretCacheError::fetch("ns", "s1", "unavailable")));
    let (manager, clock) = caching_manager(source.clone());
    manager.register_pod(&pod("a", &["s1"]));

    // Cold key: the raw error, retried on the next call.
    assert!(manager.get_secret("ns", "s1").await.unwrap_err().is_transient());
    assert_eq!(manager.get_secret("ns", "s1").await.unwrap().version(), 1);

    // Warm key: the previous value hides the failure.
    clock.advance(chrono::Duration::seconds(60));
    assert_eq!(manager.get_secret("ns", "s1").await.unwrap().version(), 1);
    assert_eq!(source.calls(), 3);
}

#[tokio::test]
async fn test_passthrough_manager_contract() {
    let source = ScriptedSource::new();
    source.push_secret("ns", "s1", 1);
    source.push_secret("ns", "s1", 2);
    let config = CacheConfig { mode: ManagerMode::Simple, ..Default::default() };
    let manager = new_secret_manager(&config, source.clone());

    manager.register_pod(&pod("a", &["s1"]));
    assert_eq!(manager.get_secret("ns", "s1").await.unwrap().version(), 1);
    assert_eq!(manager.get_secret("ns", "s1").await.unwrap().version(), 2);
    manager.unregister_pod(&pod("a", &["s1"]));
    assert_ok!(manager.get_secret("ns", "s1").await);
    assert_eq!(source.calls(), 3);
}

#[derive(Debug, Clone)]
enum Op {
    Register(usize, Vec<usize>),
    Unregister(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..4usize, prop::collection::vec(0..4usize, 0..4)).prop_map(|(p, s)| Op::Register(p, s)),
        (0..4usize).prop_map(Op::Unregister),
    ]
}

proptest! {
    #[test]
    fn prop_ref_count_matches_registered_pods(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let (manager, _) = caching_manager(ScriptedSource::new());
        let mut model: BTreeMap<usize, BTreeSet<usize>> = BTreeMap::new();

        for op in ops {
            match op {
                Op::Register(p, secrets) => {
                    let names: Vec<String> = secrets.iter().map(|s| format!("s{}", s)).collect();
                    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
                    manager.register_pod(&pod(&format!("p{}", p), &refs));
                    model.insert(p, secrets.into_iter().collect());
                }
                Op::Unregister(p) => {
                    manager.unregister_pod(&pod(&format!("p{}", p), &[]));
                    model.remove(&p);
                }
            }

            for s in 0..4usize {
                let expected = model.values().filter(|set| set.contains(&s)).count();
                let name = format!("s{}", s);
                prop_assert_eq!(manager.ref_count("ns", &name), expected);
                prop_assert_eq!(
                    manager.store().contains(&ObjectKey::new("ns", name.as_str())),
                    expected > 0
                );
            }
            prop_assert_eq!(manager.registered_pod_count(), model.len());
        }
    }
}
