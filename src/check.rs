//! Check execution contracts
//!
//! A check comes in one of two shapes, tagged at the type level:
//!
//! - [`AssetCheck`]: runs independently per asset; one failure never
//!   affects a sibling.
//! - [`BatchCheck`]: runs once per tick against all due assets of its
//!   kind and answers with one outcome per input asset, in input order.
//!
//! Implementations signal a domain failure by returning a [`CheckError`]
//! through the `anyhow` chain; any other error is normalized into the
//! same structured payload by the runner.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::Asset;

/// Domain-reported check failure with a structured payload.
#[derive(Debug, Clone)]
pub struct CheckError {
    message: String,
}

impl CheckError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The structured error payload submitted to the hub.
    pub fn to_payload(&self) -> Value {
        json!({ "message": self.message })
    }
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CheckError {}

/// Normalize any failure into the structured error payload.
///
/// A [`CheckError`] anywhere in the chain keeps its own payload; anything
/// else is wrapped using its rendered message.
pub fn error_payload(err: &anyhow::Error) -> Value {
    if let Some(check_err) = err.downcast_ref::<CheckError>() {
        return check_err.to_payload();
    }

    let message = format!("{err:#}");
    let message = if message.is_empty() {
        "unspecified check failure".to_string()
    } else {
        message
    };
    CheckError::new(message).to_payload()
}

/// Result/error pair produced by one check run on one asset.
#[derive(Debug, Clone, Default)]
pub struct CheckOutcome {
    pub result: Option<Value>,
    pub error: Option<Value>,
}

impl CheckOutcome {
    pub fn ok(result: Value) -> Self {
        Self {
            result: Some(result),
            error: None,
        }
    }

    pub fn failed(error: CheckError) -> Self {
        Self {
            result: None,
            error: Some(error.to_payload()),
        }
    }
}

/// A check executed independently per asset.
#[async_trait]
pub trait AssetCheck: Send + Sync {
    /// Key this check registers under; schedule entries select it by kind.
    fn key(&self) -> &str;

    async fn run(&self, timestamp: u64, asset: &Asset) -> anyhow::Result<CheckOutcome>;
}

/// A check executed once per tick against all due assets of its kind.
#[async_trait]
pub trait BatchCheck: Send + Sync {
    /// Key this check registers under; schedule entries select it by kind.
    fn key(&self) -> &str;

    /// Must answer with one outcome per input asset, in input order.
    async fn run(&self, timestamp: u64, assets: &[Asset]) -> anyhow::Result<Vec<CheckOutcome>>;
}

/// The two execution shapes, tagged explicitly.
#[derive(Clone)]
pub enum CheckExec {
    Single(Arc<dyn AssetCheck>),
    Batch(Arc<dyn BatchCheck>),
}

impl CheckExec {
    pub fn key(&self) -> &str {
        match self {
            CheckExec::Single(check) => check.key(),
            CheckExec::Batch(check) => check.key(),
        }
    }
}
