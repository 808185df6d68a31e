//! Error types for hub requests

use std::fmt;

/// Result type alias for hub operations
pub type HubResult<T> = Result<T, HubError>;

/// Errors surfaced by the request layer
#[derive(Debug)]
pub enum HubError {
    /// No pool/connection has been configured, or a strict-mode send was
    /// issued while disconnected
    NoConnection,

    /// The request itself failed: transport error or timeout during a send
    RequestFailed(String),
}

impl fmt::Display for HubError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HubError::NoConnection => write!(f, "no connection"),
            HubError::RequestFailed(msg) => write!(f, "request failed: {}", msg),
        }
    }
}

impl std::error::Error for HubError {}
