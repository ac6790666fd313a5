//! Contract Test: Query Enrichment & Concurrent Reloads
//!
//! Verifies the request path against a table that is being reloaded.
//!
//! Constraints verified:
//! - A mapped client gets the mapped ECS subnet, then `next` runs
//! - Unmapped clients pass through unchanged
//! - Readers racing writers only ever see whole entries
//! - Last write wins per key once writers finish
//! - A failed reload keeps previously loaded entries

mod common;

use common::*;
use cpe_ecs_core::traits::ChainEnd;
use cpe_ecs_core::{ClientSubnet, CpeEcs, CpeEcsConfig, MappingEntry, MappingStore, RequestContext};
use std::sync::Arc;

fn stage_with(entries: &[&str]) -> CpeEcs {
    let mut config = CpeEcsConfig::new();
    config.entries = entries.iter().map(|e| e.to_string()).collect();
    CpeEcs::new(config, None).expect("valid config")
}

#[tokio::test]
async fn mapped_client_gets_ecs_then_forwards() {
    let stage = stage_with(&["a 10.0.0.1 192.168.1.77", "b 10.0.0.2 2001:db8:aa:bb::1"]);
    assert_eq!(stage.reload().await.unwrap(), 2);

    let ctx = RequestContext::new();
    let next = RecordingNext::new();

    let mut query = TestQuery::from("10.0.0.1");
    stage.exec(&ctx, &mut query, &next).await.unwrap();
    let mut query_v6 = TestQuery::from("10.0.0.2");
    stage.exec(&ctx, &mut query_v6, &next).await.unwrap();

    assert_eq!(next.call_count(), 2);
    assert_eq!(
        next.seen(),
        vec![
            Some(ClientSubnet::new(ip("192.168.1.0"), 24)),
            Some(ClientSubnet::new(ip("2001:db8:aa::"), 48)),
        ]
    );
}

#[tokio::test]
async fn unmapped_client_passes_through() {
    let stage = stage_with(&["a 10.0.0.1 192.168.1.1"]);
    stage.reload().await.unwrap();

    let mut query = TestQuery::from("10.9.9.9");
    stage.exec(&RequestContext::new(), &mut query, &ChainEnd).await.unwrap();
    assert!(query.subnet.is_none());

    let mut anonymous = TestQuery::default();
    stage.exec(&RequestContext::new(), &mut anonymous, &ChainEnd).await.unwrap();
    assert!(anonymous.subnet.is_none());
}

#[tokio::test]
async fn existing_ecs_is_kept_unless_forced() {
    let existing = ClientSubnet::new(ip("203.0.113.0"), 24);

    let stage = stage_with(&["a 10.0.0.1 192.168.1.1"]);
    stage.reload().await.unwrap();
    let mut query = TestQuery::from("10.0.0.1");
    query.subnet = Some(existing);
    assert!(!stage.enrich(&mut query));
    assert_eq!(query.subnet, Some(existing));

    let mut config = CpeEcsConfig::new();
    config.entries = vec!["a 10.0.0.1 192.168.1.1".to_string()];
    config.force_overwrite = true;
    config.mask4 = 32;
    let forced = CpeEcs::new(config, None).unwrap();
    forced.reload().await.unwrap();
    assert!(forced.enrich(&mut query));
    assert_eq!(query.subnet, Some(ClientSubnet::new(ip("192.168.1.1"), 32)));
}

#[tokio::test]
async fn mapped_v4_client_matches_over_v6_socket() {
    let stage = stage_with(&["a 10.0.0.1 192.168.1.1"]);
    stage.reload().await.unwrap();

    let mut query = TestQuery::from("::ffff:10.0.0.1");
    assert!(stage.enrich(&mut query));
}

#[tokio::test]
async fn failed_reload_keeps_previous_entries() {
    let stage = stage_with(&["a 10.0.0.1 192.168.1.1", "ext:/nonexistent/cpe-ecs/list.txt"]);

    let err = stage.reload().await.unwrap_err();

    assert!(err.is_source());
    assert!(stage.store().lookup(&ip("10.0.0.1")).is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn readers_never_see_partial_entries() {
    let store = Arc::new(MappingStore::new());
    let key = ip("10.0.0.1");

    let mut writers = Vec::new();
    for w in 0..4u8 {
        let store = store.clone();
        writers.push(tokio::spawn(async move {
            for i in 0..250u8 {
                // Tag and ECS address always agree within one entry
                let entry = MappingEntry::new(
                    format!("w{}-{}", w, i),
                    key,
                    format!("192.168.{}.{}", w, i).parse().unwrap(),
                );
                store.store(key, entry);
                tokio::task::yield_now().await;
            }
        }));
    }

    let mut readers = Vec::new();
    for _ in 0..4 {
        let store = store.clone();
        readers.push(tokio::spawn(async move {
            for _ in 0..500 {
                if let Some(entry) = store.lookup(&key) {
                    let expected = entry
                        .tag
                        .trim_start_matches('w')
                        .replace('-', ".");
                    assert_eq!(entry.ecs_address.to_string(), format!("192.168.{}", expected));
                }
                tokio::task::yield_now().await;
            }
        }));
    }

    for handle in writers.into_iter().chain(readers) {
        handle.await.unwrap();
    }

    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn last_store_wins_after_sequential_loads() {
    let loader = fresh_loader();

    loader.load("a 10.0.0.1 192.168.1.1").await.unwrap();
    loader.load("b 10.0.0.1 192.168.1.2").await.unwrap();
    loader.load("c 10.0.0.1 2001:db8::3").await.unwrap();

    let entry = loader.store().lookup(&ip("10.0.0.1")).unwrap();
    assert_eq!(entry.tag, "c");
    assert_eq!(entry.ecs_address, ip("2001:db8::3"));
    assert!(entry.is_v6);
}
