//! WebSocket handler for dashboard connections.

use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use log::{debug, info, warn};

use crate::api::AppState;

use super::types::{DashboardCommand, DashboardEvent};

/// Ping interval for keepalive.
const PING_INTERVAL_SECS: u64 = 30;

/// WebSocket upgrade handler.
///
/// GET /ws
pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

/// Handle a dashboard WebSocket connection.
async fn handle_ws_connection(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    let hub = state.hub.clone();
    let (conn_id, mut event_rx) = hub.register_connection();
    let mut hub_events = hub.subscribe();

    // Late joiners immediately learn the current connectivity; there is no
    // replay of earlier events, only this snapshot.
    state.wa.announce_snapshot(conn_id).await;

    // Spawn task to push events out to this client.
    let send_task = tokio::spawn(async move {
        let mut ping_interval = tokio::time::interval(Duration::from_secs(PING_INTERVAL_SECS));

        loop {
            tokio::select! {
                // Events targeted at this connection
                Some(event) = event_rx.recv() => {
                    if !forward_event(&mut sender, &event).await {
                        break;
                    }
                }

                // Hub-wide broadcasts
                Ok(event) = hub_events.recv() => {
                    if !forward_event(&mut sender, &event).await {
                        break;
                    }
                }

                // Periodic keepalive
                _ = ping_interval.tick() => {
                    if sender.send(Message::Ping(Bytes::new())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Process incoming commands.
    while let Some(msg_result) = receiver.next().await {
        match msg_result {
            Ok(Message::Text(text)) => {
                let text_str = text.to_string();
                match serde_json::from_str::<DashboardCommand>(&text_str) {
                    Ok(cmd) => {
                        if let Err(e) = handle_command(&state, conn_id, cmd).await {
                            // No error event goes back to the dashboard;
                            // failures are only visible server-side.
                            warn!("Command from connection {} failed: {:#}", conn_id, e);
                        }
                    }
                    Err(e) => {
                        warn!(
                            "Failed to parse command from connection {}: {} - {}",
                            conn_id, e, text_str
                        );
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                debug!("Ignoring binary message from connection {}", conn_id);
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!("Connection {} closed by the dashboard", conn_id);
                break;
            }
            Err(e) => {
                warn!("WebSocket error on connection {}: {}", conn_id, e);
                break;
            }
        }
    }

    send_task.abort();
    hub.unregister_connection(conn_id);
    info!("Dashboard connection {} closed", conn_id);
}

/// Serialize and send one event; returns false when the socket is gone.
async fn forward_event(sender: &mut SplitSink<WebSocket, Message>, event: &DashboardEvent) -> bool {
    let json = match serde_json::to_string(event) {
        Ok(json) => json,
        Err(e) => {
            warn!("Failed to serialize event: {}", e);
            return true;
        }
    };
    sender.send(Message::Text(json.into())).await.is_ok()
}

/// Handle a command from a dashboard client.
pub async fn handle_command(
    state: &AppState,
    conn_id: usize,
    cmd: DashboardCommand,
) -> anyhow::Result<()> {
    match cmd {
        DashboardCommand::EnviarMensagem { numero, mensagem } => {
            state.wa.send_direct_message(&numero, &mensagem).await?;
            info!("Message sent to {}", numero);
            Ok(())
        }

        DashboardCommand::DesconectarInstancia => {
            info!("Disconnect requested by connection {}", conn_id);
            state.wa.disconnect().await?;
            // Best-effort confirmation; every dashboard drops to pairing.
            state.hub.broadcast(DashboardEvent::Desconectado);
            Ok(())
        }

        DashboardCommand::ConectarInstancia => {
            state.wa.initialize().await?;
            Ok(())
        }

        DashboardCommand::AtualizarInfo => {
            if let Some(info) = state.wa.account_info().await {
                state.hub.send_to(conn_id, DashboardEvent::Info(info)).await;
            }
            Ok(())
        }
    }
}
