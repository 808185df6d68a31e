//! HubClient - typed request surface over the dispatcher
//!
//! An explicitly constructed client with a bounded lifecycle: build it at
//! startup, pass clones to whoever reports results, close it at shutdown.
//! One method per request the hub answers.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::{AssetId, CheckId};

use super::connection::ConnectionManager;
use super::dispatch::{DeliveryMode, RequestDispatcher};
use super::error::HubResult;
use super::pool::Endpoint;
use super::proto::{CheckData, HubRequest};
use super::transport::Connector;

/// Client for the hub's request/response RPC surface.
///
/// With `auto_reconnect` the client retries sends until delivered;
/// without it every send is a single strict attempt.
#[derive(Clone)]
pub struct HubClient {
    manager: ConnectionManager,
    dispatcher: RequestDispatcher,
}

impl HubClient {
    pub fn new(connector: Arc<dyn Connector>, auto_reconnect: bool) -> Self {
        let manager = ConnectionManager::new(connector, auto_reconnect);
        let mode = if auto_reconnect {
            DeliveryMode::Resilient
        } else {
            DeliveryMode::Strict
        };
        let dispatcher = RequestDispatcher::new(manager.clone(), mode);

        Self {
            manager,
            dispatcher,
        }
    }

    /// Seed the endpoint pool and start connecting.
    pub async fn connect_pool(&self, endpoints: Vec<Endpoint>) -> anyhow::Result<()> {
        self.manager.connect_pool(endpoints).await
    }

    /// Connect to a single hub node.
    pub async fn connect(&self, host: &str, port: u16, timeout: Duration) -> anyhow::Result<()> {
        self.manager.connect_single(host, port, timeout).await
    }

    pub async fn is_connected(&self) -> bool {
        self.manager.is_connected().await
    }

    /// Close the active transport; does not trigger auto-reconnect.
    pub async fn close(&self) {
        self.manager.close().await;
    }

    pub async fn test_expression(&self, path: Vec<Value>, expression: &str) -> HubResult<Value> {
        self.dispatcher
            .send(HubRequest::TestExpression {
                path,
                expression: expression.to_string(),
            })
            .await
    }

    pub async fn get_state(&self, asset_id: AssetId) -> HubResult<Value> {
        self.dispatcher.send(HubRequest::GetState { asset_id }).await
    }

    pub async fn get_path(
        &self,
        container_ids: Vec<u64>,
        asset_ids: Vec<AssetId>,
        path: Vec<Value>,
        metrics: Option<Vec<String>>,
        expr: Option<Value>,
    ) -> HubResult<Value> {
        self.dispatcher
            .send(HubRequest::GetPath {
                container_ids,
                asset_ids,
                path,
                metrics,
                expr,
            })
            .await
    }

    pub async fn get_path_set(
        &self,
        container_ids: Vec<u64>,
        asset_ids: Vec<AssetId>,
        path: Vec<Value>,
        metric: &str,
    ) -> HubResult<Value> {
        self.dispatcher
            .send(HubRequest::GetPathSet {
                container_ids,
                asset_ids,
                path,
                metric: metric.to_string(),
            })
            .await
    }

    pub async fn get_alert(&self, alert: Vec<Value>) -> HubResult<Value> {
        self.dispatcher.send(HubRequest::GetAlert { alert }).await
    }

    pub async fn get_agentcores_info(&self, agentcore_ids: Vec<u64>) -> HubResult<Value> {
        self.dispatcher
            .send(HubRequest::GetAgentcoresInfo { agentcore_ids })
            .await
    }

    pub async fn get_alerts_count(
        &self,
        container_ids: Vec<u64>,
        asset_ids: Vec<AssetId>,
        user_id: Option<u64>,
    ) -> HubResult<Value> {
        self.dispatcher
            .send(HubRequest::GetAlertsCount {
                container_ids,
                asset_ids,
                user_id,
            })
            .await
    }

    pub async fn get_alerts(
        &self,
        container_ids: Vec<u64>,
        asset_ids: Vec<AssetId>,
        user_id: Option<u64>,
        with_actions: bool,
        with_names: bool,
    ) -> HubResult<Value> {
        self.dispatcher
            .send(HubRequest::GetAlerts {
                container_ids,
                asset_ids,
                user_id,
                with_actions,
                with_names,
            })
            .await
    }

    pub async fn alerts_assign(
        &self,
        alerts: Vec<Value>,
        message: &str,
        user_id: u64,
        assign_user_id: u64,
        ts: u64,
    ) -> HubResult<Value> {
        self.dispatcher
            .send(HubRequest::AlertsAssign {
                alerts,
                message: message.to_string(),
                user_id,
                assign_user_id,
                ts,
            })
            .await
    }

    pub async fn alerts_message(
        &self,
        alerts: Vec<Value>,
        message: &str,
        user_id: u64,
        ts: u64,
    ) -> HubResult<Value> {
        self.dispatcher
            .send(HubRequest::AlertsMessage {
                alerts,
                message: message.to_string(),
                user_id,
                ts,
            })
            .await
    }

    pub async fn alerts_close(
        &self,
        alerts: Vec<Value>,
        message: &str,
        user_id: u64,
        ts: u64,
    ) -> HubResult<Value> {
        self.dispatcher
            .send(HubRequest::AlertsClose {
                alerts,
                message: message.to_string(),
                user_id,
                ts,
            })
            .await
    }

    pub async fn alerts_integration_call(
        &self,
        alerts: Vec<Value>,
        user_id: u64,
        integration_key: u64,
        data: Value,
        ts: u64,
    ) -> HubResult<Value> {
        self.dispatcher
            .send(HubRequest::AlertsIntegrationCall {
                alerts,
                user_id,
                integration_key,
                data,
                ts,
            })
            .await
    }

    /// Submit one check outcome for `(asset_id, check_id)`.
    pub async fn send_check_data(
        &self,
        asset_id: AssetId,
        check_id: CheckId,
        data: CheckData,
    ) -> HubResult<Value> {
        self.dispatcher
            .send(HubRequest::SendCheckData {
                asset_id,
                check_id,
                data,
            })
            .await
    }
}
