use std::time::Duration;

use anyhow::Context;
use tracing::trace;

use crate::hub::{DEFAULT_HUB_PORT, Endpoint};

const HUB_HOSTLIST: &str = "HUB_HOSTLIST";

const HUB_HOST: &str = "HUB_HOST";

const HUB_PORT: &str = "HUB_PORT";

const TICK_INTERVAL: &str = "TICK_INTERVAL";

const DEFAULT_HUB_HOST: &str = "hub";

const DEFAULT_TICK_INTERVAL: u64 = 2;

/// Runtime configuration of the collector core.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct CollectorConfig {
    /// Hub endpoints as `"host"` or `"host:port"` strings
    pub hub_addresses: Vec<String>,

    /// Tick cadence in seconds, clamped to 1..=60
    #[serde(default = "default_tick_interval")]
    pub tick_interval: u64,

    /// Flag every submission as excluded from hub-side statistics
    #[serde(default)]
    pub no_count: bool,
}

fn default_tick_interval() -> u64 {
    DEFAULT_TICK_INTERVAL
}

impl CollectorConfig {
    /// Build a configuration from environment variables.
    ///
    /// `HUB_HOSTLIST` takes a `,`- or `;`-separated address list and wins
    /// over the single `HUB_HOST`/`HUB_PORT` pair; `TICK_INTERVAL` adjusts
    /// the cadence. Unset or unparsable values fall back to defaults.
    pub fn from_env() -> Self {
        let hub_addresses = match std::env::var(HUB_HOSTLIST) {
            Ok(list) => list
                .replace(';', ",")
                .split(',')
                .map(str::trim)
                .filter(|address| !address.is_empty())
                .map(str::to_string)
                .collect(),
            Err(_) => {
                let host =
                    std::env::var(HUB_HOST).unwrap_or_else(|_| DEFAULT_HUB_HOST.to_string());
                let port = std::env::var(HUB_PORT)
                    .ok()
                    .and_then(|port| port.parse::<u16>().ok())
                    .unwrap_or(DEFAULT_HUB_PORT);
                vec![format!("{host}:{port}")]
            }
        };

        let tick_interval = std::env::var(TICK_INTERVAL)
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_TICK_INTERVAL);

        Self {
            hub_addresses,
            tick_interval,
            no_count: false,
        }
    }

    /// Parsed hub endpoints, in configured order.
    pub fn endpoints(&self) -> anyhow::Result<Vec<Endpoint>> {
        self.hub_addresses.iter().map(|a| Endpoint::parse(a)).collect()
    }

    /// Tick cadence, clamped to 1..=60 seconds.
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs(self.tick_interval.clamp(1, 60))
    }
}

pub fn read_config_file(path: &str) -> anyhow::Result<CollectorConfig> {
    let file_content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read configuration file `{path}`"))?;
    serde_json::from_str(&file_content)
        .map_err(|_| anyhow::anyhow!("Invalid configuration file provided!"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
