//! RequestDispatcher - delivery guarantees on top of the connection
//!
//! Two modes, fixed at construction:
//!
//! - **Resilient**: a send blocks until the hub has answered, waiting out
//!   disconnects and retrying failed transmissions indefinitely. Eventual
//!   delivery under eventual connectivity, no latency bound, no
//!   backpressure.
//! - **Strict**: a send is attempted exactly once against the current
//!   connection and every failure surfaces to the caller.

use std::time::Duration;

use serde_json::Value;
use tracing::{error, info};

use super::connection::ConnectionManager;
use super::error::{HubError, HubResult};
use super::proto::HubRequest;

/// Timeout for a single request/response round trip.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Poll interval while waiting for a connection to come back.
const CONNECT_POLL: Duration = Duration::from_secs(1);

/// Pause before retrying a failed transmission.
const RETRY_PAUSE: Duration = Duration::from_secs(1);

/// Delivery policy for [`RequestDispatcher::send`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Retry until delivered (requires auto-reconnect)
    Resilient,
    /// One attempt, failures surface to the caller
    Strict,
}

/// Turns a typed request into a completed response over the current
/// connection.
#[derive(Clone)]
pub struct RequestDispatcher {
    manager: ConnectionManager,
    mode: DeliveryMode,
}

impl RequestDispatcher {
    pub fn new(manager: ConnectionManager, mode: DeliveryMode) -> Self {
        Self { manager, mode }
    }

    pub fn mode(&self) -> DeliveryMode {
        self.mode
    }

    /// Send a request and await the decoded response payload.
    pub async fn send(&self, request: HubRequest) -> HubResult<Value> {
        match self.mode {
            DeliveryMode::Resilient => self.ensure_send(request).await,
            DeliveryMode::Strict => self.send_once(request).await,
        }
    }

    /// Retry until the hub has answered.
    ///
    /// Fails immediately only when no pool has ever been configured; any
    /// later failure is absorbed and retried.
    async fn ensure_send(&self, request: HubRequest) -> HubResult<Value> {
        if !self.manager.has_pool().await {
            return Err(HubError::NoConnection);
        }

        loop {
            let Some(conn) = self.manager.connection().await else {
                info!("waiting for a hub connection");
                self.manager.reconnect();
                tokio::time::sleep(CONNECT_POLL).await;
                continue;
            };

            match conn.request(request.clone(), REQUEST_TIMEOUT).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    error!("failed to transmit request: {:#} (will try again)", e);
                    tokio::time::sleep(RETRY_PAUSE).await;
                }
            }
        }
    }

    /// One attempt against the current connection.
    async fn send_once(&self, request: HubRequest) -> HubResult<Value> {
        let conn = self
            .manager
            .connection()
            .await
            .ok_or(HubError::NoConnection)?;

        conn.request(request, REQUEST_TIMEOUT)
            .await
            .map_err(|e| HubError::RequestFailed(format!("{e:#}")))
    }
}
