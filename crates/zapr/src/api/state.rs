//! Application state shared across handlers.

use std::path::PathBuf;
use std::sync::Arc;

use crate::wa::WaService;
use crate::ws::WsHub;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Adapter around the external automation client.
    pub wa: Arc<WaService>,
    /// Fanout hub for dashboard connections.
    pub hub: Arc<WsHub>,
    /// Directory of static dashboard assets served at `/`.
    pub static_dir: PathBuf,
    /// CORS origins allowed to reach the API and realtime channel.
    pub allowed_origins: Vec<String>,
}

impl AppState {
    pub fn new(
        wa: Arc<WaService>,
        hub: Arc<WsHub>,
        static_dir: PathBuf,
        allowed_origins: Vec<String>,
    ) -> Self {
        Self {
            wa,
            hub,
            static_dir,
            allowed_origins,
        }
    }
}
