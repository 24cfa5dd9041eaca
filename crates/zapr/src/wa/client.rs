//! The boundary trait isolating the relay from the automation client's
//! internals.
//!
//! The external client is event-driven: after `initialize` it raises
//! lifecycle events on the channel it was handed. Everything above this
//! seam speaks only [`ClientEvent`] and the operations below.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::error::WaResult;
use super::models::{AccountInfo, Chat};

/// Lifecycle events raised by the automation client.
///
/// These are observed, never polled. The adapter translates them into
/// dashboard events and state transitions.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// A pairing challenge was issued. The payload is already a renderable
    /// image data URL, never raw challenge text.
    Qr { image: String },

    /// The client authenticated against the remote service. The payload is
    /// an opaque session blob; it drives no state transition.
    Authenticated { session: serde_json::Value },

    /// The client is fully connected and ready to send.
    Ready { info: AccountInfo },

    /// Authentication was rejected by the remote service.
    AuthFailure { reason: String },

    /// The client lost its connection.
    Disconnected { reason: String },
}

/// Operations the external automation client must provide.
#[async_trait]
pub trait WaClient: Send + Sync + 'static {
    /// Kick off the client's own connection sequence. Lifecycle events are
    /// raised asynchronously on `events`.
    async fn initialize(&self, events: mpsc::Sender<ClientEvent>) -> WaResult<()>;

    /// Send a text message to a recipient (individual or group id).
    async fn send_message(&self, target: &str, text: &str) -> WaResult<()>;

    /// List all chats known to the client, with their group flag.
    async fn list_chats(&self) -> WaResult<Vec<Chat>>;

    /// Tear down the client's session and resources. Idempotent; a no-op
    /// when nothing is running.
    async fn destroy(&self) -> WaResult<()>;
}
