//! ConnectionManager - keeps at most one hub link alive
//!
//! Drives connect/reconnect over an [`AddressPool`] with exponential
//! backoff. Only one reconnect sequence is ever in flight; requesting one
//! while it runs is a no-op.
//!
//! ## State machine
//!
//! ```text
//! Disconnected ──connect attempt──▶ Connecting ──success──▶ Connected
//!       ▲                                                       │
//!       └──────────────── transport closed/error ───────────────┘
//! ```
//!
//! A lost link is reported by the transport through the loss hook; if
//! auto-reconnect is enabled a new reconnect sequence starts immediately.
//! An explicit [`ConnectionManager::close`] suppresses auto-reconnect.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Context;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::pool::{AddressPool, Endpoint};
use super::transport::{Connection, Connector, LossHook};

/// First connect attempt timeout; grows by 1s per failed round.
const INITIAL_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Ceiling for the per-attempt connect timeout.
const MAX_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// First backoff sleep; doubles per failed round.
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Ceiling for the backoff sleep.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Grace period before a superseded connection is hard-closed, letting
/// in-flight responses drain.
const SUPERSEDED_CLOSE_GRACE: Duration = Duration::from_secs(10);

/// Owns the single active hub connection.
///
/// Cloning is cheap and shares the same underlying state; all senders go
/// through the dispatcher, which polls this manager for the current link.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

struct Inner {
    connector: Arc<dyn Connector>,
    auto_reconnect: bool,
    connection: Mutex<Option<Arc<dyn Connection>>>,
    pool: Mutex<Option<AddressPool>>,
    reconnecting: AtomicBool,
    closed: AtomicBool,
}

impl ConnectionManager {
    pub fn new(connector: Arc<dyn Connector>, auto_reconnect: bool) -> Self {
        Self {
            inner: Arc::new(Inner {
                connector,
                auto_reconnect,
                connection: Mutex::new(None),
                pool: Mutex::new(None),
                reconnecting: AtomicBool::new(false),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Whether a live link currently exists.
    pub async fn is_connected(&self) -> bool {
        self.inner
            .connection
            .lock()
            .await
            .as_ref()
            .is_some_and(|conn| conn.is_alive())
    }

    /// Whether an endpoint pool has been configured.
    pub async fn has_pool(&self) -> bool {
        self.inner.pool.lock().await.is_some()
    }

    /// Snapshot of the current link, if alive.
    pub async fn connection(&self) -> Option<Arc<dyn Connection>> {
        self.inner
            .connection
            .lock()
            .await
            .clone()
            .filter(|conn| conn.is_alive())
    }

    /// Seed the endpoint pool and start a reconnect sequence.
    ///
    /// Fails if already connected, if a reconnect is in progress, or if the
    /// pool is empty. Returns as soon as the sequence is running; delivery
    /// of the first request is the dispatcher's concern.
    pub async fn connect_pool(&self, endpoints: Vec<Endpoint>) -> anyhow::Result<()> {
        anyhow::ensure!(!self.is_connected().await, "already connected");
        anyhow::ensure!(
            !self.inner.reconnecting.load(Ordering::SeqCst),
            "a reconnect is already in progress"
        );

        let pool = AddressPool::new(endpoints)?;
        *self.inner.pool.lock().await = Some(pool);
        self.inner.closed.store(false, Ordering::SeqCst);
        self.reconnect();

        Ok(())
    }

    /// Connect to a single endpoint with the caller's timeout.
    ///
    /// Equivalent to a pool of size one, but performs exactly one attempt
    /// and surfaces its failure.
    pub async fn connect_single(
        &self,
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> anyhow::Result<()> {
        anyhow::ensure!(!self.is_connected().await, "already connected");

        let pool = AddressPool::new(vec![Endpoint::new(host, port)])?;
        *self.inner.pool.lock().await = Some(pool);
        self.inner.closed.store(false, Ordering::SeqCst);

        self.inner.attempt_connect(timeout).await
    }

    /// Ensure a reconnect sequence is running. No-op while one is active.
    pub fn reconnect(&self) {
        self.inner.clone().start_reconnect();
    }

    /// Explicit shutdown: closes the active transport and clears state
    /// without triggering auto-reconnect.
    pub async fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        if let Some(conn) = self.inner.connection.lock().await.take() {
            conn.close();
        }
        debug!("hub connection closed");
    }
}

impl Inner {
    fn start_reconnect(self: Arc<Self>) {
        if self.reconnecting.swap(true, Ordering::SeqCst) {
            return;
        }
        tokio::spawn(async move {
            self.reconnect_loop().await;
        });
    }

    /// Loop over the pool until one attempt succeeds.
    ///
    /// The connect timeout starts at 2s and grows by 1s per failed round up
    /// to 10s; the backoff sleep starts at 1s and doubles up to 60s. The
    /// cursor advances after every attempt, so consecutive rounds walk the
    /// pool.
    async fn reconnect_loop(self: &Arc<Self>) {
        let mut superseded = self.connection.lock().await.clone();
        let mut backoff = INITIAL_BACKOFF;
        let mut timeout = INITIAL_CONNECT_TIMEOUT;

        loop {
            if self.closed.load(Ordering::SeqCst) {
                debug!("reconnect aborted: manager closed");
                break;
            }

            match self.attempt_connect(timeout).await {
                Ok(()) => {
                    if let Some(old) = superseded.take() {
                        // let in-flight responses drain before hard-closing
                        tokio::spawn(async move {
                            tokio::time::sleep(SUPERSEDED_CLOSE_GRACE).await;
                            old.close();
                        });
                    }
                    break;
                }
                Err(e) => {
                    error!(
                        "connecting to hub failed: {:#}; next attempt in {}s",
                        e,
                        backoff.as_secs()
                    );
                }
            }

            tokio::time::sleep(backoff).await;
            backoff = (backoff * 2).min(MAX_BACKOFF);
            timeout = (timeout + Duration::from_secs(1)).min(MAX_CONNECT_TIMEOUT);
        }

        self.reconnecting.store(false, Ordering::SeqCst);
    }

    /// One connection attempt against the endpoint at the cursor.
    ///
    /// The cursor advances regardless of the outcome.
    async fn attempt_connect(self: &Arc<Self>, timeout: Duration) -> anyhow::Result<()> {
        let endpoint = {
            let pool = self.pool.lock().await;
            pool.as_ref().context("no pool configured")?.current().clone()
        };

        debug!("connecting to hub at {endpoint}");

        let weak = Arc::downgrade(self);
        let on_lost: LossHook = Arc::new(move || {
            if let Some(inner) = weak.upgrade() {
                tokio::spawn(async move {
                    inner.on_connection_lost().await;
                });
            }
        });

        let attempt = self.connector.connect(&endpoint, timeout, on_lost);
        let result = tokio::time::timeout(timeout, attempt).await;

        if let Some(pool) = self.pool.lock().await.as_mut() {
            pool.advance();
        }

        match result {
            Ok(Ok(conn)) => {
                info!("connected to hub at {endpoint}");
                *self.connection.lock().await = Some(conn);
                Ok(())
            }
            Ok(Err(e)) => Err(e.context(format!("connect to {endpoint} failed"))),
            Err(_) => Err(anyhow::anyhow!(
                "connect to {endpoint} timed out after {}s",
                timeout.as_secs()
            )),
        }
    }

    /// Transport reported a dropped link.
    async fn on_connection_lost(self: Arc<Self>) {
        warn!("hub connection lost");
        *self.connection.lock().await = None;

        if self.auto_reconnect && !self.closed.load(Ordering::SeqCst) {
            self.start_reconnect();
        }
    }
}
