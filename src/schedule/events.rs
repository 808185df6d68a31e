//! Push events from the hierarchy collaborator
//!
//! The upstream service announces changes as named events with structured
//! arguments. Dispatch is an explicit per-name table producing a typed
//! [`HierarchyEvent`]; unknown names are a typed error for the caller to
//! log, never a panic.

use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use crate::{AssetId, ContainerId};

use super::source::AssetEntry;

/// A typed hierarchy change notification.
#[derive(Debug, Clone)]
pub enum HierarchyEvent {
    /// Adjust the process log level
    SetLogLevel { level: String },

    /// Replace all checks for one asset under a container
    UpsertAsset {
        container_id: ContainerId,
        asset: AssetEntry,
    },

    /// Remove the listed assets' scheduling entries under a container
    UnsetAssets {
        container_id: ContainerId,
        asset_ids: Vec<AssetId>,
    },
}

/// Errors from event parsing
#[derive(Debug)]
pub enum EventError {
    /// The event name has no registered handler
    UnknownEvent(String),

    /// The arguments did not match the event's expected shape
    BadArguments {
        event: String,
        source: serde_json::Error,
    },
}

impl fmt::Display for EventError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventError::UnknownEvent(name) => write!(f, "unknown event `{}`", name),
            EventError::BadArguments { event, source } => {
                write!(f, "bad arguments for event `{}`: {}", event, source)
            }
        }
    }
}

impl std::error::Error for EventError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EventError::BadArguments { source, .. } => Some(source),
            EventError::UnknownEvent(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct SetLogLevelArgs {
    level: String,
}

#[derive(Deserialize)]
struct UpsertAssetArgs {
    container_id: ContainerId,
    asset: AssetEntry,
}

#[derive(Deserialize)]
struct UnsetAssetsArgs {
    container_id: ContainerId,
    asset_ids: Vec<AssetId>,
}

impl HierarchyEvent {
    /// Parse a named event with its argument payload.
    ///
    /// One table row per event name the collector handles.
    pub fn parse(name: &str, args: Value) -> Result<Self, EventError> {
        fn decode<T: serde::de::DeserializeOwned>(name: &str, args: Value) -> Result<T, EventError> {
            serde_json::from_value(args).map_err(|source| EventError::BadArguments {
                event: name.to_string(),
                source,
            })
        }

        match name {
            "set-log-level" => {
                let SetLogLevelArgs { level } = decode(name, args)?;
                Ok(HierarchyEvent::SetLogLevel { level })
            }
            "upsert-asset" => {
                let UpsertAssetArgs {
                    container_id,
                    asset,
                } = decode(name, args)?;
                Ok(HierarchyEvent::UpsertAsset {
                    container_id,
                    asset,
                })
            }
            "unset-assets" => {
                let UnsetAssetsArgs {
                    container_id,
                    asset_ids,
                } = decode(name, args)?;
                Ok(HierarchyEvent::UnsetAssets {
                    container_id,
                    asset_ids,
                })
            }
            other => Err(EventError::UnknownEvent(other.to_string())),
        }
    }
}
