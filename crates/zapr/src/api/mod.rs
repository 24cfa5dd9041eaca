//! HTTP API module.
//!
//! Provides the REST command surface and the WebSocket upgrade route.

mod error;
pub mod handlers;
mod routes;
mod state;

pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
