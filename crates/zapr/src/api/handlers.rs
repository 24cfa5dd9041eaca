//! HTTP command handlers.
//!
//! These mirror the realtime commands for callers without a persistent
//! connection (automation tools, external integrations). Unlike the
//! realtime path, malformed input is rejected here with a 400.

use axum::{Json, extract::State};
use log::info;
use serde::{Deserialize, Serialize};

use crate::wa::GroupSummary;

use super::error::{ApiError, ApiResult};
use super::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub numero: String,
    #[serde(default)]
    pub mensagem: String,
}

#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub success: String,
}

/// Send a text message to an individual recipient.
///
/// POST /sendMessage
pub async fn send_message(
    State(state): State<AppState>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<Json<SendMessageResponse>> {
    if req.numero.is_empty() || req.mensagem.is_empty() {
        return Err(ApiError::MissingMessageFields);
    }

    state.wa.send_direct_message(&req.numero, &req.mensagem).await?;
    info!("Message sent to {}", req.numero);

    Ok(Json(SendMessageResponse {
        success: "Mensagem enviada com sucesso".to_string(),
    }))
}

/// List the connected account's group chats.
///
/// GET /listGroups
pub async fn list_groups(State(state): State<AppState>) -> ApiResult<Json<Vec<GroupSummary>>> {
    let groups = state.wa.list_groups().await?;
    Ok(Json(groups))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendGroupMessageRequest {
    #[serde(default)]
    pub group_id: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SendGroupMessageResponse {
    pub status: String,
}

/// Send a text message to a group, after verifying the target is one.
///
/// POST /sendMessageToGroup
pub async fn send_message_to_group(
    State(state): State<AppState>,
    Json(req): Json<SendGroupMessageRequest>,
) -> ApiResult<Json<SendGroupMessageResponse>> {
    state.wa.send_group_message(&req.group_id, &req.message).await?;
    info!("Message sent to group {}", req.group_id);

    Ok(Json(SendGroupMessageResponse {
        status: "Mensagem enviada com sucesso para o grupo.".to_string(),
    }))
}
