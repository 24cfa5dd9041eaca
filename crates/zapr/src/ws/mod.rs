//! Realtime dashboard channel: hub, wire types, and the WebSocket handler.

mod handler;
mod hub;
mod types;

pub use handler::{handle_command, ws_handler};
pub use hub::{WsHub, WsSender};
pub use types::{DashboardCommand, DashboardEvent};
