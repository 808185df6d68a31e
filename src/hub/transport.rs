//! Wire-layer seam
//!
//! The hub speaks a binary request/response protocol that is not part of
//! this crate. A transport implementation plugs in here: a [`Connector`]
//! dials one endpoint and yields a [`Connection`] that correlates
//! concurrently issued requests with their responses.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::pool::Endpoint;
use super::proto::HubRequest;

/// Invoked by the transport when an established link drops.
pub type LossHook = Arc<dyn Fn() + Send + Sync>;

/// Dials hub endpoints.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Establish a link to `endpoint` within `timeout`.
    ///
    /// The returned connection must invoke `on_lost` exactly once when the
    /// link drops for any reason other than an explicit [`Connection::close`].
    async fn connect(
        &self,
        endpoint: &Endpoint,
        timeout: Duration,
        on_lost: LossHook,
    ) -> anyhow::Result<Arc<dyn Connection>>;
}

/// One established link to a hub node.
///
/// Implementations must be safe to share across tasks: concurrent callers
/// may issue requests independently and rely on the transport to correlate
/// responses.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Issue a request and await its correlated response payload.
    async fn request(&self, request: HubRequest, timeout: Duration) -> anyhow::Result<Value>;

    /// Whether the link is still usable.
    fn is_alive(&self) -> bool;

    /// Close the underlying transport. Idempotent.
    fn close(&self);
}
