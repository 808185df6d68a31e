//! Endpoint pool with round-robin failover

use std::fmt;

use anyhow::Context;
use rand::Rng;

/// Port the hub listens on when an address does not name one.
pub const DEFAULT_HUB_PORT: u16 = 8700;

/// A candidate hub address. Immutable once the pool is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse `"host"` or `"host:port"`, falling back to [`DEFAULT_HUB_PORT`].
    pub fn parse(address: &str) -> anyhow::Result<Self> {
        let address = address.trim();
        anyhow::ensure!(!address.is_empty(), "empty hub address");

        match address.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse()
                    .with_context(|| format!("invalid port in hub address `{address}`"))?;
                Ok(Self::new(host, port))
            }
            None => Ok(Self::new(address, DEFAULT_HUB_PORT)),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Ordered, fixed set of candidate endpoints with a rotating cursor.
///
/// The cursor advances after every connection attempt, success or failure,
/// so repeated attempts walk the pool round-robin. The starting position is
/// randomized so a fleet of collectors does not pile onto the same node.
#[derive(Debug, Clone)]
pub struct AddressPool {
    endpoints: Vec<Endpoint>,
    cursor: usize,
}

impl AddressPool {
    /// Build a pool over a non-empty endpoint list.
    pub fn new(endpoints: Vec<Endpoint>) -> anyhow::Result<Self> {
        anyhow::ensure!(
            !endpoints.is_empty(),
            "pool must contain at least one endpoint"
        );
        let cursor = rand::rng().random_range(0..endpoints.len());

        Ok(Self { endpoints, cursor })
    }

    /// The endpoint the next connection attempt should target.
    pub fn current(&self) -> &Endpoint {
        &self.endpoints[self.cursor]
    }

    /// Rotate to the next endpoint, wrapping around.
    pub fn advance(&mut self) {
        self.cursor = (self.cursor + 1) % self.endpoints.len();
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}
