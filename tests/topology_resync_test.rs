//! Node-set discovery timing against a scripted resolver

mod common;

use common::{node, ScriptedResolver, RESYNC};
use statedash::CacheTopology;
use std::sync::Arc;
use std::time::Duration;

fn topology(resolver: &Arc<ScriptedResolver>) -> CacheTopology {
    CacheTopology::new("memcached.test.svc", 11211, RESYNC, resolver.clone())
}

#[tokio::test(start_paused = true)]
async fn test_change_is_visible_only_after_the_interval() {
    let resolver = ScriptedResolver::with_nodes(vec![node(1)]);
    let topology = topology(&resolver);

    let initial = topology.current_nodes().await;
    assert_eq!(initial.len(), 1);

    resolver.set_nodes(vec![node(1), node(2)]);

    tokio::time::advance(Duration::from_secs(9)).await;
    assert!(Arc::ptr_eq(&initial, &topology.current_nodes().await));

    // Exactly one interval is not yet stale
    tokio::time::advance(Duration::from_secs(1)).await;
    assert!(Arc::ptr_eq(&initial, &topology.current_nodes().await));
    assert_eq!(resolver.lookups(), 1);

    tokio::time::advance(Duration::from_millis(1)).await;
    let changed = topology.current_nodes().await;
    assert_eq!(changed.len(), 2);
    assert!(changed.contains(&node(2)));
    assert_eq!(resolver.lookups(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_unchanged_answer_keeps_the_same_snapshot() {
    let resolver = ScriptedResolver::with_nodes(vec![node(2), node(1)]);
    let topology = topology(&resolver);

    let first = topology.snapshot().await;
    resolver.set_nodes(vec![node(1), node(2)]);
    tokio::time::advance(RESYNC * 2).await;
    let second = topology.snapshot().await;

    assert!(Arc::ptr_eq(&first.nodes, &second.nodes));
    assert_eq!(first.generation, second.generation);
    assert!(second.last_resync > first.last_resync);
    assert_eq!(resolver.lookups(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_failed_resolution_empties_the_set_until_next_resync() {
    let resolver = ScriptedResolver::with_nodes(vec![node(1)]);
    let topology = topology(&resolver);
    assert_eq!(topology.current_nodes().await.len(), 1);

    resolver.fail_with("SERVFAIL");
    tokio::time::advance(RESYNC + Duration::from_millis(1)).await;
    assert!(topology.current_nodes().await.is_empty());

    // Recovery waits for the next interval like any other change
    resolver.set_nodes(vec![node(4)]);
    assert!(topology.current_nodes().await.is_empty());
    tokio::time::advance(RESYNC + Duration::from_millis(1)).await;
    assert_eq!(topology.current_nodes().await.iter().copied().collect::<Vec<_>>(), vec![node(4)]);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_first_callers_resolve_once() {
    let resolver = ScriptedResolver::with_nodes(vec![node(1), node(2), node(3)]);
    let topology = Arc::new(topology(&resolver));

    let readers = (0..16).map(|_| {
        let topology = Arc::clone(&topology);
        tokio::spawn(async move { topology.current_nodes().await.len() })
    });
    for len in futures::future::join_all(readers).await {
        assert_eq!(len.unwrap(), 3);
    }
    assert_eq!(resolver.lookups(), 1);
}
