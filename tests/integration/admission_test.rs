//! Admission-control integration tests.

mod helpers;

use chrono::Duration;

use helpers::{STALE_AFTER, TestApp};
use wsi_core::error::ErrorKind;
use wsi_core::traits::storage::KeyValueStorage;
use wsi_session::AdmissionResult;

#[tokio::test]
async fn test_empty_state_has_room() {
    let app = TestApp::new();

    let has_room = app
        .manager
        .sync_and_invalidate_sessions("key1", 1, STALE_AFTER)
        .await
        .unwrap();

    assert!(has_room);
    assert_eq!(app.manager.get_count("key2").await.unwrap(), 0);
}

#[tokio::test]
async fn test_single_live_session_fills_cap_of_one() {
    let app = TestApp::new();
    app.seed_live_session("imageSessionId1", "key1").await;

    let has_room = app
        .manager
        .sync_and_invalidate_sessions("key2", 1, STALE_AFTER)
        .await
        .unwrap();

    assert!(!has_room);
    assert_eq!(app.manager.get_count("key2").await.unwrap(), 1);
}

#[tokio::test]
async fn test_two_live_sessions_over_cap_of_one() {
    let app = TestApp::new();
    app.seed_live_session("imageSessionId1", "key1").await;
    app.seed_live_session("imageSessionId2", "key2").await;

    let has_room = app
        .manager
        .sync_and_invalidate_sessions("key3", 1, STALE_AFTER)
        .await
        .unwrap();

    assert!(!has_room);
    assert_eq!(app.manager.get_count("key3").await.unwrap(), 2);
}

#[tokio::test]
async fn test_count_equal_to_cap_has_no_room() {
    let app = TestApp::new();
    app.seed_live_session("imageSessionId1", "key1").await;
    app.seed_live_session("imageSessionId2", "key2").await;

    let has_room = app
        .manager
        .sync_and_invalidate_sessions("key3", 2, STALE_AFTER)
        .await
        .unwrap();

    assert!(!has_room);
    assert_eq!(app.manager.get_count("key3").await.unwrap(), 2);
}

#[tokio::test]
async fn test_cap_one_above_count_has_room() {
    let app = TestApp::new();
    app.seed_live_session("imageSessionId1", "key1").await;
    app.seed_live_session("imageSessionId2", "key2").await;

    let has_room = app
        .manager
        .sync_and_invalidate_sessions("key3", 3, STALE_AFTER)
        .await
        .unwrap();

    assert!(has_room);
    assert_eq!(app.manager.get_count("key3").await.unwrap(), 2);
}

#[tokio::test]
async fn test_stale_sessions_evicted_to_make_room() {
    let app = TestApp::new();
    app.seed_session("imageSessionId1", "key1", Duration::minutes(5))
        .await;
    app.seed_session("imageSessionId2", "key2", Duration::minutes(5))
        .await;

    let has_room = app
        .manager
        .sync_and_invalidate_sessions("key3", 2, STALE_AFTER)
        .await
        .unwrap();

    assert!(has_room);
    assert_eq!(app.manager.get_count("key3").await.unwrap(), 1);
    assert_eq!(app.fleet.sessions_on(&app.tiles).await.len(), 1);
}

#[tokio::test]
async fn test_expired_session_removed_under_cap_of_one() {
    let app = TestApp::new();
    app.seed_session("imageSessionId1", "key1", Duration::minutes(5))
        .await;
    app.seed_live_session("imageSessionId2", "key2").await;

    let has_room = app
        .manager
        .sync_and_invalidate_sessions("key3", 1, STALE_AFTER)
        .await
        .unwrap();

    assert!(has_room);
    assert!(!app.storage.exists(&app.record("key1")).await.unwrap());
    assert!(app.storage.exists(&app.record("key2")).await.unwrap());
    assert_eq!(app.manager.get_count("key3").await.unwrap(), 1);
}

#[tokio::test]
async fn test_oldest_of_two_expired_sessions_removed_under_cap_of_one() {
    let app = TestApp::new();
    app.seed_session("imageSessionId1", "key1", Duration::minutes(5))
        .await;
    app.seed_session("imageSessionId2", "key2", Duration::minutes(6))
        .await;

    let has_room = app
        .manager
        .sync_and_invalidate_sessions("key3", 1, STALE_AFTER)
        .await
        .unwrap();

    assert!(has_room);
    assert!(app.storage.exists(&app.record("key1")).await.unwrap());
    assert!(!app.storage.exists(&app.record("key2")).await.unwrap());
    assert_eq!(app.manager.get_count("key3").await.unwrap(), 1);
}

#[tokio::test]
async fn test_cap_holds_across_storage_nodes() {
    let app = TestApp::with_storage_nodes(&[
        "redis://node-a:6379",
        "redis://node-b:6379",
        "redis://node-c:6379",
    ]);
    for i in 0..6 {
        app.seed_live_session(&format!("session-{i}"), &format!("slide-{i}"))
            .await;
    }

    let has_room = app
        .manager
        .sync_and_invalidate_sessions("slide-0", 6, STALE_AFTER)
        .await
        .unwrap();

    assert!(!has_room);
    for i in 0..6 {
        assert_eq!(app.manager.get_count(&format!("slide-{i}")).await.unwrap(), 6);
    }
}

#[tokio::test]
async fn test_session_closed_on_tile_server_frees_capacity() {
    let app = TestApp::new();
    app.seed_live_session("imageSessionId1", "key1").await;
    app.seed_live_session("imageSessionId2", "key2").await;
    assert!(
        !app.manager
            .sync_and_invalidate_sessions("key3", 2, STALE_AFTER)
            .await
            .unwrap()
    );

    app.fleet.close_session(&app.tiles, "imageSessionId1").await;

    let has_room = app
        .manager
        .sync_and_invalidate_sessions("key3", 2, STALE_AFTER)
        .await
        .unwrap();
    assert!(has_room);
    assert!(!app.storage.exists(&app.record("key1")).await.unwrap());
    assert_eq!(app.manager.get_count("key3").await.unwrap(), 1);
}

#[tokio::test]
async fn test_admit_grants_until_full() {
    let app = TestApp::new();
    let stale_after = std::time::Duration::from_secs(600);

    let first = app
        .manager
        .admit("slide-a", "viewer-1", 2, stale_after)
        .await
        .unwrap();
    assert_eq!(first, AdmissionResult::Granted);
    app.fleet.open_session(&app.tiles, "viewer-1", "slide-a").await;

    let second = app
        .manager
        .admit("slide-b", "viewer-2", 2, stale_after)
        .await
        .unwrap();
    assert!(second.is_granted());
    app.fleet.open_session(&app.tiles, "viewer-2", "slide-b").await;

    let third = app
        .manager
        .admit("slide-c", "viewer-3", 2, stale_after)
        .await
        .unwrap();
    assert!(!third.is_granted());
    assert_eq!(app.manager.get_count("slide-c").await.unwrap(), 2);
}

#[tokio::test]
async fn test_unreachable_tile_server_is_an_error() {
    let app = TestApp::new();
    app.seed_live_session("imageSessionId1", "key1").await;
    app.fleet.set_unreachable(true);

    let err = app
        .manager
        .admit("key2", "imageSessionId2", 4, STALE_AFTER)
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::ExternalService);
    assert!(!app.storage.exists(&app.record("key2")).await.unwrap());
}
