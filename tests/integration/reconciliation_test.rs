//! Reconciliation and routing integration tests.

mod helpers;

use std::collections::HashMap;
use std::sync::Arc;

use helpers::{STALE_AFTER, TestApp};
use wsi_cache::memory::MemoryKeyValueStorage;
use wsi_cache::sharding::ConsistentHashSharding;
use wsi_core::error::ErrorKind;
use wsi_core::traits::sharding::ShardingAlgorithm;
use wsi_core::traits::storage::KeyValueStorage;
use wsi_core::types::session_data::SessionData;
use wsi_core::types::shard::{RedisShard, TileServerShard};

fn remote(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(id, key)| (id.to_string(), key.to_string()))
        .collect()
}

#[tokio::test]
async fn test_update_twice_matches_update_once() {
    let app = TestApp::new();
    app.storage
        .set(&app.record("orphan"), "{\"broken\":")
        .await
        .unwrap();
    app.manager
        .set_session("dropped", "oldSession", &app.tiles)
        .await
        .unwrap();

    let sessions = remote(&[("imageSessionId1", "key1"), ("imageSessionId2", "key2")]);

    app.storage
        .update("key1", &sessions, &app.tiles)
        .await
        .unwrap();
    let once = app.storage.get_all_keys(&app.record("key1")).await.unwrap();

    app.storage
        .update("key1", &sessions, &app.tiles)
        .await
        .unwrap();
    let twice = app.storage.get_all_keys(&app.record("key1")).await.unwrap();

    assert_eq!(once, twice);
    assert_eq!(twice, vec![app.record("key1"), app.record("key2")]);
}

#[tokio::test]
async fn test_corrupt_record_does_not_hide_valid_ones() {
    let app = TestApp::new();
    app.seed_live_session("imageSessionId1", "key1").await;
    app.seed_live_session("imageSessionId2", "key2").await;
    app.storage
        .set(&app.record("key3"), "not json at all")
        .await
        .unwrap();

    let entries = app
        .storage
        .get_all_key_values(&app.record("key1"))
        .await
        .unwrap();
    assert_eq!(entries.len(), 3);

    let parsed: Vec<&SessionData> = entries
        .iter()
        .filter_map(|e| e.session_data.as_ref())
        .collect();
    assert_eq!(parsed.len(), 2);

    let corrupt = entries.iter().find(|e| e.key == app.record("key3")).unwrap();
    assert!(corrupt.session_data.is_none());

    // Corrupt records are not sessions.
    assert_eq!(app.manager.get_count("key1").await.unwrap(), 2);
}

#[tokio::test]
async fn test_corrupt_record_collected_by_sync() {
    let app = TestApp::new();
    app.seed_live_session("imageSessionId1", "key1").await;
    app.storage
        .set(&app.record("key3"), "not json at all")
        .await
        .unwrap();

    let has_room = app
        .manager
        .sync_and_invalidate_sessions("key1", 2, STALE_AFTER)
        .await
        .unwrap();

    assert!(has_room);
    assert!(!app.storage.exists(&app.record("key3")).await.unwrap());
    assert!(app.storage.exists(&app.record("key1")).await.unwrap());
}

#[tokio::test]
async fn test_sharding_is_deterministic_across_instances() {
    let urls = ["http://tiles-a:5000", "http://tiles-b:5000", "http://tiles-c:5000"];
    let first = ConsistentHashSharding::new(TileServerShard::pool(urls), 160);
    let second = ConsistentHashSharding::new(TileServerShard::pool(urls), 160);

    for i in 0..200 {
        let key = format!("slides/case-{i}.svs");
        let shard = first.get_shard(&key).await.unwrap();
        assert_eq!(first.get_shard(&key).await.unwrap(), shard);
        assert_eq!(second.get_shard(&key).await.unwrap(), shard);
    }
}

#[tokio::test]
async fn test_empty_pool_fails_routing() {
    let sharding = ConsistentHashSharding::<TileServerShard>::new(Vec::new(), 160);
    let err = sharding.get_shard("key1").await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::NoShardsAvailable);
}

#[tokio::test]
async fn test_listing_stays_on_one_storage_shard() {
    let redis = Arc::new(ConsistentHashSharding::new(
        RedisShard::pool(["redis://a:6379", "redis://b:6379", "redis://c:6379"]),
        160,
    ));
    let storage = MemoryKeyValueStorage::new(redis.clone(), 1000);
    let tiles = TileServerShard::new("http://tiles-a:5000");

    for i in 0..60 {
        let data = SessionData::new(format!("session-{i}"), tiles.clone());
        storage
            .set(&format!("key{i}"), &serde_json::to_string(&data).unwrap())
            .await
            .unwrap();
    }

    let home = redis.get_shard("key0").await.unwrap();
    let listed = storage.get_all_key_values("key0").await.unwrap();
    assert!(listed.len() < 60);
    for entry in &listed {
        assert_eq!(redis.get_shard(&entry.key).await.unwrap(), home);
    }
}

#[tokio::test]
async fn test_duplicate_remote_sessions_settle_on_one_record() {
    let app = TestApp::new();
    app.fleet
        .open_session(&app.tiles, "viewer-b", "slide-a")
        .await;
    app.fleet
        .open_session(&app.tiles, "viewer-a", "slide-a")
        .await;

    for _ in 0..3 {
        app.manager
            .sync_and_invalidate_sessions("slide-a", 4, STALE_AFTER)
            .await
            .unwrap();
        let raw = app
            .storage
            .get(&app.record("slide-a"))
            .await
            .unwrap()
            .unwrap();
        let data: SessionData = serde_json::from_str(&raw).unwrap();
        assert_eq!(data.session_id, "viewer-a");
    }
    assert_eq!(app.manager.get_count("slide-a").await.unwrap(), 1);
}
