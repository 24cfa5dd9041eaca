//! Error types for the automation-client adapter.

use thiserror::Error;

/// Result type for adapter operations.
pub type WaResult<T> = Result<T, WaError>;

/// Errors that can occur while talking to the automation client.
#[derive(Debug, Error)]
pub enum WaError {
    /// Operation requires a connected client.
    #[error("client is not connected")]
    NotConnected,

    /// The targeted chat is not a group.
    #[error("chat {0} is not a group")]
    InvalidTarget(String),

    /// Outbound send was rejected by the bridge or transport.
    #[error("send failed: {0}")]
    Send(String),

    /// Chat/account query failed.
    #[error("query failed: {0}")]
    Query(String),

    /// The remote service rejected authentication.
    #[error("authentication failed: {0}")]
    AuthFailure(String),

    /// Session artifact removal failed.
    #[error("session teardown failed: {0}")]
    Teardown(#[source] std::io::Error),

    /// Transport-level failure talking to the bridge.
    #[error("bridge request failed: {0}")]
    Bridge(#[from] reqwest::Error),
}

impl WaError {
    /// Fold a client failure into the send taxonomy.
    pub(crate) fn into_send(self) -> WaError {
        match self {
            WaError::Send(_) => self,
            other => WaError::Send(other.to_string()),
        }
    }

    /// Fold a client failure into the query taxonomy.
    pub(crate) fn into_query(self) -> WaError {
        match self {
            WaError::Query(_) => self,
            other => WaError::Query(other.to_string()),
        }
    }
}
