//! WebSocket message types for the dashboard realtime channel.
//!
//! Event and command names are the wire contract the dashboard already
//! speaks; they must not be renamed.

use serde::{Deserialize, Serialize};

use crate::wa::AccountInfo;

// ============================================================================
// Events (Server -> Dashboard)
// ============================================================================

/// Events broadcast from the relay to dashboard clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum DashboardEvent {
    /// Pairing QR code, as a renderable image data URL.
    Qr(String),

    /// Account snapshot of the connected session.
    Info(AccountInfo),

    /// Raw connectivity boolean.
    ConnectionStatus(bool),

    /// Confirmation that the instance was disconnected and its session
    /// artifact removed.
    Desconectado,
}

// ============================================================================
// Commands (Dashboard -> Server)
// ============================================================================

/// Commands accepted from any dashboard client. There is no per-subscriber
/// authorization and no error event back on failure; failures are logged
/// server-side only.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum DashboardCommand {
    /// Send a text message to an individual recipient.
    EnviarMensagem { numero: String, mensagem: String },

    /// Tear down the client and delete the session artifact.
    DesconectarInstancia,

    /// Start the client's connection sequence.
    ConectarInstancia,

    /// Re-emit the cached account snapshot to the requesting client.
    AtualizarInfo,
}
