//! Connection failover and delivery guarantee tests
//!
//! These tests drive the hub client against scripted transports:
//! - reconnect backoff and connect-timeout growth
//! - pool failover past refused nodes
//! - resilient vs strict send semantics
//! - loss-triggered reconnects and explicit close

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use collector_core::hub::{Endpoint, HubClient, HubError};

use super::helpers::*;

async fn wait_until_connected(client: &HubClient) {
    for _ in 0..3000 {
        if client.is_connected().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("client never connected");
}

#[tokio::test]
async fn strict_send_while_disconnected_fails_immediately() {
    let connector = Arc::new(ScriptedConnector::new());
    let client = HubClient::new(connector, false);

    let result = client.get_state(1).await;
    assert_matches!(result, Err(HubError::NoConnection));
}

#[tokio::test]
async fn strict_send_surfaces_request_failure() {
    let connector = Arc::new(ScriptedConnector::new().with_request_failures(1));
    let client = HubClient::new(connector.clone(), false);

    client
        .connect("hub", 8700, Duration::from_secs(1))
        .await
        .unwrap();

    let result = client.get_state(1).await;
    assert_matches!(result, Err(HubError::RequestFailed(_)));

    // no retry happened: the connection saw exactly the failing request
    assert!(connector.latest_connection().requests().is_empty());
}

#[tokio::test]
async fn resilient_send_without_pool_fails() {
    let connector = Arc::new(ScriptedConnector::new());
    let client = HubClient::new(connector, true);

    let result = client.get_state(1).await;
    assert_matches!(result, Err(HubError::NoConnection));
}

#[tokio::test(start_paused = true)]
async fn resilient_send_completes_once_connected() {
    let connector = Arc::new(ScriptedConnector::new().with_connect_failures(3));
    let client = HubClient::new(connector.clone(), true);

    client
        .connect_pool(vec![Endpoint::new("hub", 8700)])
        .await
        .unwrap();

    // issued while the reconnect sequence is still failing
    let response = client.get_state(42).await.unwrap();
    assert_eq!(response["ok"], true);

    assert!(connector.attempts().len() >= 4);
}

#[tokio::test(start_paused = true)]
async fn resilient_send_retries_failed_requests() {
    let connector = Arc::new(ScriptedConnector::new().with_request_failures(2));
    let client = HubClient::new(connector.clone(), true);

    client
        .connect_pool(vec![Endpoint::new("hub", 8700)])
        .await
        .unwrap();

    let response = client.get_state(42).await.unwrap();
    assert_eq!(response["ok"], true);

    // two failed transmissions were absorbed before the recorded one
    assert_eq!(connector.latest_connection().requests().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn backoff_doubles_and_timeout_grows() {
    let connector = Arc::new(ScriptedConnector::new().with_connect_failures(8));
    let client = HubClient::new(connector.clone(), true);

    client
        .connect_pool(vec![Endpoint::new("hub", 8700)])
        .await
        .unwrap();
    wait_until_connected(&client).await;

    let attempts = connector.attempts();
    assert_eq!(attempts.len(), 9);

    let timeouts: Vec<u64> = attempts.iter().map(|a| a.timeout.as_secs()).collect();
    assert_eq!(timeouts, vec![2, 3, 4, 5, 6, 7, 8, 9, 10]);

    let gaps: Vec<u64> = attempts
        .windows(2)
        .map(|pair| (pair[1].at - pair[0].at).as_secs())
        .collect();
    assert_eq!(gaps, vec![1, 2, 4, 8, 16, 32, 60, 60]);
}

#[tokio::test(start_paused = true)]
async fn pool_failover_walks_past_refused_nodes() {
    let connector = Arc::new(ScriptedConnector::new().refusing_host("bad"));
    let client = HubClient::new(connector.clone(), true);

    client
        .connect_pool(vec![Endpoint::new("bad", 8700), Endpoint::new("good", 8700)])
        .await
        .unwrap();
    wait_until_connected(&client).await;

    let attempts = connector.attempts();
    assert_eq!(attempts.last().unwrap().endpoint.host, "good");
    // regardless of the randomized starting cursor, at most one round
    // of failures was needed
    assert!(attempts.len() <= 2);
}

#[tokio::test(start_paused = true)]
async fn lost_connection_triggers_reconnect() {
    let connector = Arc::new(ScriptedConnector::new());
    let client = HubClient::new(connector.clone(), true);

    client
        .connect("hub", 8700, Duration::from_secs(1))
        .await
        .unwrap();
    assert!(client.is_connected().await);

    connector.latest_connection().drop_link();
    assert!(!client.is_connected().await);

    wait_until_connected(&client).await;
    assert_eq!(connector.connections().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn close_suppresses_auto_reconnect() {
    let connector = Arc::new(ScriptedConnector::new());
    let client = HubClient::new(connector.clone(), true);

    client
        .connect("hub", 8700, Duration::from_secs(1))
        .await
        .unwrap();
    client.close().await;

    tokio::time::sleep(Duration::from_secs(120)).await;

    assert!(!client.is_connected().await);
    assert_eq!(connector.connections().len(), 1);
}

#[tokio::test]
async fn concurrent_senders_share_the_connection() {
    let connector = Arc::new(ScriptedConnector::new());
    let client = HubClient::new(connector.clone(), false);

    client
        .connect("hub", 8700, Duration::from_secs(1))
        .await
        .unwrap();

    let calls = (0..5u64).map(|asset_id| {
        let client = client.clone();
        async move { client.get_state(asset_id).await }
    });
    let results = futures::future::join_all(calls).await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(connector.latest_connection().requests().len(), 5);
}

#[tokio::test]
async fn connect_pool_rejects_empty_pool() {
    let connector = Arc::new(ScriptedConnector::new());
    let client = HubClient::new(connector, true);

    assert!(client.connect_pool(vec![]).await.is_err());
}

#[tokio::test(start_paused = true)]
async fn reconnect_sequence_is_not_reentrant() {
    let connector = Arc::new(ScriptedConnector::new().with_connect_failures(usize::MAX));
    let client = HubClient::new(connector.clone(), true);

    client
        .connect_pool(vec![Endpoint::new("hub", 8700)])
        .await
        .unwrap();

    // a second pool connect while the sequence is in flight is refused
    let result = client.connect_pool(vec![Endpoint::new("other", 8700)]).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn connect_twice_is_refused() {
    let connector = Arc::new(ScriptedConnector::new());
    let client = HubClient::new(connector, false);

    client
        .connect("hub", 8700, Duration::from_secs(1))
        .await
        .unwrap();

    let result = client.connect("hub", 8700, Duration::from_secs(1)).await;
    assert!(result.is_err());
}
