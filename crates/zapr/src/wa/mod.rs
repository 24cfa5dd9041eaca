//! WhatsApp automation-client adapter.
//!
//! The relay never touches the external client directly; everything goes
//! through [`WaService`] and the [`WaClient`] seam.

pub mod bridge;
mod client;
mod error;
mod models;
mod service;
mod session;

pub use bridge::{BridgeClient, BridgeConfig};
pub use client::{ClientEvent, WaClient};
pub use error::{WaError, WaResult};
pub use models::{AccountInfo, Chat, ConnectionState, GroupSummary};
pub use service::WaService;
pub use session::SessionStore;
