//! Resilient RPC client for the hub
//!
//! This module implements the connection side of the collector runtime:
//! a pool of candidate hub endpoints, a connection manager that keeps at
//! most one link alive, and a request dispatcher that layers delivery
//! guarantees on top of it.
//!
//! ## Architecture Overview
//!
//! ```text
//! HubClient (typed request surface)
//!     │
//!     ▼
//! RequestDispatcher ── resilient: retry until delivered
//!     │                strict:    fail fast
//!     ▼
//! ConnectionManager ── reconnect loop, backoff, pool failover
//!     │
//!     ▼
//! Connector / Connection (wire layer, injected)
//! ```
//!
//! The wire encoding itself is not part of this crate: transports are
//! injected through the [`transport::Connector`] trait and only have to
//! correlate requests with responses.

pub mod client;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod pool;
pub mod proto;
pub mod transport;

pub use client::HubClient;
pub use connection::ConnectionManager;
pub use dispatch::{DeliveryMode, RequestDispatcher};
pub use error::{HubError, HubResult};
pub use pool::{AddressPool, DEFAULT_HUB_PORT, Endpoint};
pub use proto::{CheckData, Framework, HubRequest};
pub use transport::{Connection, Connector, LossHook};
