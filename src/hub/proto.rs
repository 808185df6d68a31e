//! Typed request surface of the hub protocol
//!
//! One variant per request the hub answers. Every variant maps 1:1 onto a
//! pending response on the wire; the transport is free to serialize the
//! payloads however its encoding demands.

use serde::Serialize;
use serde_json::Value;

use crate::{AssetId, CheckId};

/// Requests the hub understands.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "request", content = "data", rename_all = "kebab-case")]
pub enum HubRequest {
    TestExpression {
        path: Vec<Value>,
        expression: String,
    },
    GetState {
        asset_id: AssetId,
    },
    GetPath {
        container_ids: Vec<u64>,
        asset_ids: Vec<AssetId>,
        path: Vec<Value>,
        metrics: Option<Vec<String>>,
        expr: Option<Value>,
    },
    GetPathSet {
        container_ids: Vec<u64>,
        asset_ids: Vec<AssetId>,
        path: Vec<Value>,
        metric: String,
    },
    GetAlert {
        alert: Vec<Value>,
    },
    GetAgentcoresInfo {
        agentcore_ids: Vec<u64>,
    },
    GetAlertsCount {
        container_ids: Vec<u64>,
        asset_ids: Vec<AssetId>,
        user_id: Option<u64>,
    },
    GetAlerts {
        container_ids: Vec<u64>,
        asset_ids: Vec<AssetId>,
        user_id: Option<u64>,
        with_actions: bool,
        with_names: bool,
    },
    AlertsAssign {
        alerts: Vec<Value>,
        message: String,
        user_id: u64,
        assign_user_id: u64,
        ts: u64,
    },
    AlertsMessage {
        alerts: Vec<Value>,
        message: String,
        user_id: u64,
        ts: u64,
    },
    AlertsClose {
        alerts: Vec<Value>,
        message: String,
        user_id: u64,
        ts: u64,
    },
    AlertsIntegrationCall {
        alerts: Vec<Value>,
        user_id: u64,
        integration_key: u64,
        data: Value,
        ts: u64,
    },
    SendCheckData {
        asset_id: AssetId,
        check_id: CheckId,
        data: CheckData,
    },
}

impl HubRequest {
    /// Partition id for requests the hub shards by asset.
    pub fn partition(&self) -> Option<u64> {
        match self {
            HubRequest::SendCheckData { asset_id, .. } => Some(*asset_id),
            _ => None,
        }
    }
}

/// Outcome of one check run on one asset, as submitted to the hub.
#[derive(Debug, Clone, Serialize)]
pub struct CheckData {
    pub result: Option<Value>,
    pub error: Option<Value>,
    pub framework: Framework,
}

/// Timing metadata the framework attaches to every submission.
#[derive(Debug, Clone, Serialize)]
pub struct Framework {
    /// Seconds between the start of the run and this submission
    pub duration: f64,

    /// Unix timestamp at which the run started
    pub timestamp: u64,

    /// Submissions flagged no-count are excluded from hub-side statistics
    pub no_count: bool,
}
