pub mod check;
pub mod config;
pub mod hub;
pub mod runner;
pub mod schedule;

use std::fmt;

use serde_json::{Map, Value};

/// Identifier of a container node in the asset hierarchy.
pub type ContainerId = u64;

/// Identifier of a monitored asset, scoped to its container.
pub type AssetId = u64;

/// Identifier of a configured check on an asset.
pub type CheckId = u64;

/// Resolved configuration for one scheduled check.
///
/// The interval is resolved at load time and always positive; the option map
/// is the merge of the service-level and check-level layers, the check-level
/// layer winning on key collision.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckConfig {
    interval: u64,
    options: Map<String, Value>,
}

impl CheckConfig {
    /// Merge the service-level and check-level option layers on top of the
    /// resolved interval. Empty or absent layers are no-ops.
    pub fn merge(
        interval: u64,
        service: Option<&Map<String, Value>>,
        check: Option<&Map<String, Value>>,
    ) -> Self {
        let mut options = Map::new();
        for layer in [service, check].into_iter().flatten() {
            for (key, value) in layer {
                options.insert(key.clone(), value.clone());
            }
        }

        Self {
            // a zero interval would break the spreading modulo
            interval: interval.max(1),
            options,
        }
    }

    /// The scheduling interval in seconds, always > 0.
    pub fn interval(&self) -> u64 {
        self.interval
    }

    /// Look up a single merged option.
    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    /// All merged options.
    pub fn options(&self) -> &Map<String, Value> {
        &self.options
    }
}

/// A unit of due work: one check on one asset, snapshotted for execution.
///
/// Assets are created per tick and discarded after their result has been
/// submitted; mutations of the schedule never reach an asset in flight.
#[derive(Debug, Clone)]
pub struct Asset {
    pub container_id: ContainerId,
    pub asset_id: AssetId,
    pub check_id: CheckId,
    pub config: CheckConfig,
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "asset {} (container {}, check {})",
            self.asset_id, self.container_id, self.check_id
        )
    }
}
