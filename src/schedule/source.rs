//! Hierarchy query seam
//!
//! The container/asset tree lives in an upstream graph-data service that
//! also pushes change events. Only its query surface is modeled here: a
//! [`ContainerSource`] answers snapshot queries for the root and for
//! individual containers.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{AssetId, CheckId, ContainerId};

/// Snapshot of one container: its assets and its direct children.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContainerSnapshot {
    #[serde(default)]
    pub assets: Vec<AssetEntry>,

    #[serde(default)]
    pub children: Vec<ContainerId>,
}

/// One asset and the services configured on it.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetEntry {
    pub asset_id: AssetId,

    #[serde(default)]
    pub services: Vec<ServiceEntry>,
}

/// A service binds a collector to an asset with a config layer and checks.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceEntry {
    /// Key of the collector this service belongs to
    pub collector: String,

    /// Service-level config layer, may be empty
    #[serde(default)]
    pub config: Option<Map<String, Value>>,

    #[serde(default)]
    pub checks: Vec<CheckEntry>,
}

/// One configured check within a service.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckEntry {
    pub check_id: CheckId,

    /// Check key, selects the implementation
    pub key: String,

    /// Scheduling interval in seconds
    pub interval: u64,

    /// Check-level config layer, may be empty
    #[serde(default)]
    pub config: Option<Map<String, Value>>,
}

/// Query surface of the hierarchical configuration collaborator.
#[async_trait]
pub trait ContainerSource: Send + Sync {
    /// The root container id and its snapshot.
    async fn root(&self) -> anyhow::Result<(ContainerId, ContainerSnapshot)>;

    /// Snapshot of one container by id.
    async fn container(&self, id: ContainerId) -> anyhow::Result<ContainerSnapshot>;
}
