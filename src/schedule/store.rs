//! ScheduleStore - checks-per-asset configuration
//!
//! Hierarchical mapping from (container, asset) to the set of checks
//! configured for that asset, built by walking the container tree and
//! merged from per-service and per-check override layers. Mutated
//! incrementally by upsert/unset events.

use std::collections::HashMap;

use anyhow::Context;
use tracing::{debug, instrument};

use crate::{AssetId, CheckConfig, CheckId, ContainerId};

use super::source::{AssetEntry, ContainerSource};

/// One scheduled check: which implementation, with what merged config.
#[derive(Debug, Clone)]
pub struct ScheduledCheck {
    /// Check key, selects the implementation
    pub kind: String,

    pub config: CheckConfig,
}

/// All scheduling entries for this collector.
///
/// There is never more than one entry per (container, asset, check) key;
/// last write wins. Entries only exist for services matching the
/// collector's key.
#[derive(Debug)]
pub struct ScheduleStore {
    collector_key: String,
    entries: HashMap<(ContainerId, AssetId), HashMap<CheckId, ScheduledCheck>>,
}

impl ScheduleStore {
    pub fn new(collector_key: impl Into<String>) -> Self {
        Self {
            collector_key: collector_key.into(),
            entries: HashMap::new(),
        }
    }

    pub fn collector_key(&self) -> &str {
        &self.collector_key
    }

    /// Number of scheduled assets.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all scheduling entries.
    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (ContainerId, AssetId, CheckId, &ScheduledCheck)> {
        self.entries.iter().flat_map(|((container_id, asset_id), checks)| {
            checks
                .iter()
                .map(move |(check_id, check)| (*container_id, *asset_id, *check_id, check))
        })
    }

    /// Look up one entry.
    pub fn get(
        &self,
        container_id: ContainerId,
        asset_id: AssetId,
        check_id: CheckId,
    ) -> Option<&ScheduledCheck> {
        self.entries
            .get(&(container_id, asset_id))
            .and_then(|checks| checks.get(&check_id))
    }

    /// Replace all scheduling entries for one asset.
    ///
    /// Services not belonging to this collector are ignored; an asset whose
    /// services yield no checks ends up with no entry at all. This is the
    /// upsert path: the previous check set is dropped in the same step.
    pub fn apply_asset(&mut self, container_id: ContainerId, entry: &AssetEntry) {
        let key = (container_id, entry.asset_id);
        self.entries.remove(&key);

        let mut checks: HashMap<CheckId, ScheduledCheck> = HashMap::new();
        for service in &entry.services {
            if service.collector != self.collector_key {
                continue;
            }

            for check in &service.checks {
                let config = CheckConfig::merge(
                    check.interval,
                    service.config.as_ref(),
                    check.config.as_ref(),
                );
                checks.insert(
                    check.check_id,
                    ScheduledCheck {
                        kind: check.key.clone(),
                        config,
                    },
                );
            }
        }

        if !checks.is_empty() {
            self.entries.insert(key, checks);
        }
    }

    /// Drop the listed assets under one container; others stay untouched.
    pub fn remove_assets(&mut self, container_id: ContainerId, asset_ids: &[AssetId]) {
        for asset_id in asset_ids {
            self.entries.remove(&(container_id, *asset_id));
        }
    }

    /// Walk the container tree from the root and store every merged entry.
    ///
    /// Containers without assets and assets without checks are skipped, not
    /// errors.
    #[instrument(skip_all)]
    pub async fn load_all(&mut self, source: &dyn ContainerSource) -> anyhow::Result<()> {
        let (root_id, root) = source.root().await.context("failed to query root container")?;

        let mut pending = vec![(root_id, root)];
        while let Some((container_id, snapshot)) = pending.pop() {
            for entry in &snapshot.assets {
                if entry.services.is_empty() {
                    continue;
                }
                self.apply_asset(container_id, entry);
            }

            for child_id in snapshot.children {
                let child = source
                    .container(child_id)
                    .await
                    .with_context(|| format!("failed to query container {child_id}"))?;
                pending.push((child_id, child));
            }
        }

        debug!("loaded {} scheduled asset(s)", self.len());
        Ok(())
    }
}
