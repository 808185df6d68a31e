//! End-to-end scheduling and execution tests
//!
//! A collector actor is spawned over a fake container tree and a scripted
//! hub transport; the tests observe the check-data submissions the hub
//! would receive.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use collector_core::check::CheckExec;
use collector_core::hub::{HubClient, HubRequest};
use collector_core::runner::CollectorHandle;
use collector_core::schedule::HierarchyEvent;
use serde_json::json;

use super::helpers::*;

async fn connected_client(connector: &Arc<ScriptedConnector>) -> HubClient {
    let client = HubClient::new(connector.clone(), false);
    client
        .connect("hub", 8700, Duration::from_secs(1))
        .await
        .unwrap();
    client
}

fn check_data(request: &HubRequest) -> (u64, u64, &collector_core::hub::CheckData) {
    match request {
        HubRequest::SendCheckData {
            asset_id,
            check_id,
            data,
        } => (*asset_id, *check_id, data),
        other => panic!("unexpected request: {other:?}"),
    }
}

#[tokio::test]
async fn single_check_results_reach_the_hub() {
    let connector = Arc::new(ScriptedConnector::new());
    let client = connected_client(&connector).await;

    let tree = FakeTree::single_container(
        1,
        vec![
            service_asset(10, "test", "echo", 100, 1),
            service_asset(11, "test", "echo", 101, 1),
        ],
    );

    let _handle = CollectorHandle::spawn(
        &test_config(1, false),
        "test",
        vec![CheckExec::Single(Arc::new(EchoCheck))],
        &tree,
        client,
        None,
    )
    .await
    .unwrap();

    let requests = connector
        .latest_connection()
        .wait_for_requests(2, Duration::from_secs(5))
        .await;

    let mut seen = Vec::new();
    for request in &requests[..2] {
        let (asset_id, check_id, data) = check_data(request);
        assert_eq!(data.result, Some(json!({"asset_id": asset_id})));
        assert_eq!(data.error, None);
        assert!(data.framework.timestamp > 0);
        assert!(data.framework.duration >= 0.0);
        assert!(!data.framework.no_count);
        seen.push((asset_id, check_id));
    }
    seen.sort_unstable();
    assert_eq!(seen, vec![(10, 100), (11, 101)]);
}

#[tokio::test]
async fn domain_failure_is_reported_and_loop_survives() {
    let connector = Arc::new(ScriptedConnector::new());
    let client = connected_client(&connector).await;

    let tree =
        FakeTree::single_container(1, vec![service_asset(10, "test", "failing", 100, 1)]);

    let handle = CollectorHandle::spawn(
        &test_config(1, false),
        "test",
        vec![CheckExec::Single(Arc::new(FailingCheck))],
        &tree,
        client,
        None,
    )
    .await
    .unwrap();

    let requests = connector
        .latest_connection()
        .wait_for_requests(1, Duration::from_secs(5))
        .await;

    let (_, _, data) = check_data(&requests[0]);
    assert_eq!(data.result, None);
    assert_eq!(data.error, Some(json!({"message": "boom"})));

    // the failure did not kill the actor
    assert!(handle.tick_now().await.is_ok());
}

#[tokio::test]
async fn batch_failure_assigns_the_same_error_to_every_asset() {
    let connector = Arc::new(ScriptedConnector::new());
    let client = connected_client(&connector).await;

    let tree = FakeTree::single_container(
        1,
        vec![
            service_asset(10, "test", "failing-batch", 100, 1),
            service_asset(11, "test", "failing-batch", 101, 1),
            service_asset(12, "test", "failing-batch", 102, 1),
        ],
    );

    let _handle = CollectorHandle::spawn(
        &test_config(1, false),
        "test",
        vec![CheckExec::Batch(Arc::new(FailingBatch))],
        &tree,
        client,
        None,
    )
    .await
    .unwrap();

    let requests = connector
        .latest_connection()
        .wait_for_requests(3, Duration::from_secs(5))
        .await;

    let mut asset_ids = Vec::new();
    for request in &requests[..3] {
        let (asset_id, _, data) = check_data(request);
        assert_eq!(data.result, None);
        assert_eq!(data.error, Some(json!({"message": "batch boom"})));
        asset_ids.push(asset_id);
    }
    asset_ids.sort_unstable();
    assert_eq!(asset_ids, vec![10, 11, 12]);
}

#[tokio::test]
async fn batch_results_pair_with_their_assets() {
    let connector = Arc::new(ScriptedConnector::new());
    let client = connected_client(&connector).await;

    let tree = FakeTree::single_container(
        1,
        vec![
            service_asset(10, "test", "echo-batch", 100, 1),
            service_asset(11, "test", "echo-batch", 101, 1),
            service_asset(12, "test", "echo-batch", 102, 1),
        ],
    );

    let _handle = CollectorHandle::spawn(
        &test_config(1, false),
        "test",
        vec![CheckExec::Batch(Arc::new(EchoBatch))],
        &tree,
        client,
        None,
    )
    .await
    .unwrap();

    let requests = connector
        .latest_connection()
        .wait_for_requests(3, Duration::from_secs(5))
        .await;

    // every submission carries the outcome computed for its own asset
    for request in &requests[..3] {
        let (asset_id, _, data) = check_data(request);
        assert_eq!(data.result, Some(json!({"asset_id": asset_id})));
    }
}

#[tokio::test]
async fn unknown_check_kind_is_skipped() {
    let connector = Arc::new(ScriptedConnector::new());
    let client = connected_client(&connector).await;

    let tree =
        FakeTree::single_container(1, vec![service_asset(10, "test", "mystery", 100, 1)]);

    let handle = CollectorHandle::spawn(
        &test_config(1, false),
        "test",
        vec![CheckExec::Single(Arc::new(EchoCheck))],
        &tree,
        client,
        None,
    )
    .await
    .unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(connector.latest_connection().requests().is_empty());

    // the unknown kind did not kill the actor
    assert!(handle.tick_now().await.is_ok());
}

#[tokio::test]
async fn upsert_extends_the_schedule_between_ticks() {
    let connector = Arc::new(ScriptedConnector::new());
    let client = connected_client(&connector).await;

    let tree = FakeTree::single_container(1, vec![]);

    let handle = CollectorHandle::spawn(
        &test_config(1, false),
        "test",
        vec![CheckExec::Single(Arc::new(EchoCheck))],
        &tree,
        client,
        None,
    )
    .await
    .unwrap();

    handle
        .events()
        .send(HierarchyEvent::UpsertAsset {
            container_id: 1,
            asset: service_asset(10, "test", "echo", 100, 1),
        })
        .await
        .unwrap();

    let requests = connector
        .latest_connection()
        .wait_for_requests(1, Duration::from_secs(5))
        .await;

    let (asset_id, check_id, _) = check_data(&requests[0]);
    assert_eq!((asset_id, check_id), (10, 100));
}

#[tokio::test]
async fn unset_assets_stops_their_scheduling() {
    let connector = Arc::new(ScriptedConnector::new());
    let client = connected_client(&connector).await;

    let tree =
        FakeTree::single_container(1, vec![service_asset(10, "test", "echo", 100, 1)]);

    let handle = CollectorHandle::spawn(
        &test_config(1, false),
        "test",
        vec![CheckExec::Single(Arc::new(EchoCheck))],
        &tree,
        client,
        None,
    )
    .await
    .unwrap();

    connector
        .latest_connection()
        .wait_for_requests(1, Duration::from_secs(5))
        .await;

    handle
        .events()
        .send(HierarchyEvent::UnsetAssets {
            container_id: 1,
            asset_ids: vec![10],
        })
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    let baseline = connector.latest_connection().requests().len();
    tokio::time::sleep(Duration::from_millis(2200)).await;
    assert_eq!(connector.latest_connection().requests().len(), baseline);
}

#[tokio::test]
async fn no_count_flag_reaches_the_framework_payload() {
    let connector = Arc::new(ScriptedConnector::new());
    let client = connected_client(&connector).await;

    let tree =
        FakeTree::single_container(1, vec![service_asset(10, "test", "echo", 100, 1)]);

    let _handle = CollectorHandle::spawn(
        &test_config(1, true),
        "test",
        vec![CheckExec::Single(Arc::new(EchoCheck))],
        &tree,
        client,
        None,
    )
    .await
    .unwrap();

    let requests = connector
        .latest_connection()
        .wait_for_requests(1, Duration::from_secs(5))
        .await;

    let (_, _, data) = check_data(&requests[0]);
    assert!(data.framework.no_count);
}

#[tokio::test]
async fn set_log_level_event_invokes_the_hook() {
    let connector = Arc::new(ScriptedConnector::new());
    let client = connected_client(&connector).await;

    let tree = FakeTree::single_container(1, vec![]);
    let seen: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
    let seen_hook = seen.clone();

    let handle = CollectorHandle::spawn(
        &test_config(1, false),
        "test",
        vec![],
        &tree,
        client,
        Some(Box::new(move |level| {
            *seen_hook.lock().unwrap() = Some(level.to_string());
        })),
    )
    .await
    .unwrap();

    handle
        .events()
        .send(HierarchyEvent::SetLogLevel {
            level: "debug".to_string(),
        })
        .await
        .unwrap();

    for _ in 0..100 {
        if seen.lock().unwrap().as_deref() == Some("debug") {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("log level hook was never invoked");
}

#[tokio::test]
async fn shutdown_closes_the_hub_client() {
    let connector = Arc::new(ScriptedConnector::new());
    let client = connected_client(&connector).await;

    let tree = FakeTree::single_container(1, vec![]);

    let handle = CollectorHandle::spawn(
        &test_config(1, false),
        "test",
        vec![],
        &tree,
        client.clone(),
        None,
    )
    .await
    .unwrap();

    handle.shutdown().await.unwrap();

    for _ in 0..100 {
        if !client.is_connected().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("hub client was never closed");
}
