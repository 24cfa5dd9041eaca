//! HTTP API error type.
//!
//! Response bodies are part of the dashboard/integration wire contract and
//! keep the upstream Portuguese strings.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use log::error;
use serde_json::json;
use thiserror::Error;

use crate::wa::WaError;

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Recipient or message text missing from the request body.
    #[error("Número e mensagem são necessários")]
    MissingMessageFields,

    /// The targeted chat is not a group.
    #[error("O ID fornecido não pertence a um grupo.")]
    NotAGroup,

    /// Anything the caller cannot act on.
    #[error("Erro interno do servidor")]
    Internal(#[source] WaError),
}

impl From<WaError> for ApiError {
    fn from(err: WaError) -> Self {
        match err {
            WaError::InvalidTarget(_) => ApiError::NotAGroup,
            other => ApiError::Internal(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::MissingMessageFields => {
                (StatusCode::BAD_REQUEST, json!({"error": self.to_string()}))
            }
            // The group endpoint reports its validation failure under the
            // same key it uses for success.
            ApiError::NotAGroup => (StatusCode::BAD_REQUEST, json!({"status": self.to_string()})),
            ApiError::Internal(source) => {
                error!("Request failed: {}", source);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"error": self.to_string()}),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
