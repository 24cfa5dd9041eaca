//! Realtime command-path integration tests.
//!
//! These drive the same dispatch the WebSocket handler uses, without going
//! through a socket.

use std::sync::atomic::Ordering;

use zapr::wa::ConnectionState;
use zapr::ws::{DashboardCommand, DashboardEvent, handle_command};

mod common;
use common::{connected_app, test_app, wait_for_state};

#[tokio::test]
async fn test_connect_command_initializes_client_once() {
    let t = test_app();
    let (conn_id, _rx) = t.hub.register_connection();

    handle_command(&t.state, conn_id, DashboardCommand::ConectarInstancia)
        .await
        .unwrap();
    wait_for_state(&t.wa, ConnectionState::Connected).await;

    // Repeated connect requests never spawn a second client.
    handle_command(&t.state, conn_id, DashboardCommand::ConectarInstancia)
        .await
        .unwrap();
    assert_eq!(t.bridge.init_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_pairing_broadcasts_qr_then_ready_events() {
    let t = test_app();
    let mut sub = t.hub.subscribe();
    let (conn_id, _rx) = t.hub.register_connection();

    handle_command(&t.state, conn_id, DashboardCommand::ConectarInstancia)
        .await
        .unwrap();
    wait_for_state(&t.wa, ConnectionState::Connected).await;

    assert!(matches!(sub.recv().await, Ok(DashboardEvent::Qr(_))));
    assert!(matches!(sub.recv().await, Ok(DashboardEvent::Info(_))));
    assert!(matches!(
        sub.recv().await,
        Ok(DashboardEvent::ConnectionStatus(true))
    ));
}

#[tokio::test]
async fn test_send_command_records_message() {
    let t = connected_app().await;
    let (conn_id, _rx) = t.hub.register_connection();

    handle_command(
        &t.state,
        conn_id,
        DashboardCommand::EnviarMensagem {
            numero: "5511999999999".to_string(),
            mensagem: "oi".to_string(),
        },
    )
    .await
    .unwrap();

    let sent = t.bridge.sent.lock().unwrap();
    assert_eq!(
        sent.as_slice(),
        &[("5511999999999".to_string(), "oi".to_string())]
    );
}

/// A failing send surfaces only as a handler error; no event reaches any
/// dashboard.
#[tokio::test]
async fn test_send_command_failure_stays_server_side() {
    let t = connected_app().await;
    t.bridge.fail_sends.store(true, Ordering::SeqCst);
    let mut sub = t.hub.subscribe();
    let (conn_id, _rx) = t.hub.register_connection();

    let result = handle_command(
        &t.state,
        conn_id,
        DashboardCommand::EnviarMensagem {
            numero: "5511999999999".to_string(),
            mensagem: "oi".to_string(),
        },
    )
    .await;

    assert!(result.is_err());
    assert!(sub.try_recv().is_err());
}

#[tokio::test]
async fn test_disconnect_command_removes_artifact_and_broadcasts() {
    let t = connected_app().await;
    let mut sub = t.hub.subscribe();
    let (conn_id, _rx) = t.hub.register_connection();
    assert!(t.artifact_path.exists());

    handle_command(&t.state, conn_id, DashboardCommand::DesconectarInstancia)
        .await
        .unwrap();

    assert!(!t.artifact_path.exists());
    assert_eq!(t.bridge.destroy_calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        t.wa.connection_snapshot().await,
        ConnectionState::Disconnected
    );
    assert!(matches!(sub.recv().await, Ok(DashboardEvent::Desconectado)));
}

/// The second disconnect finds no artifact and still succeeds.
#[tokio::test]
async fn test_disconnect_command_is_idempotent() {
    let t = connected_app().await;
    let (conn_id, _rx) = t.hub.register_connection();

    handle_command(&t.state, conn_id, DashboardCommand::DesconectarInstancia)
        .await
        .unwrap();
    handle_command(&t.state, conn_id, DashboardCommand::DesconectarInstancia)
        .await
        .unwrap();

    assert_eq!(t.bridge.destroy_calls.load(Ordering::SeqCst), 2);
}

/// The info refresh goes to the requesting connection only.
#[tokio::test]
async fn test_refresh_info_targets_requester_only() {
    let t = connected_app().await;
    let (conn_a, mut rx_a) = t.hub.register_connection();
    let (_conn_b, mut rx_b) = t.hub.register_connection();

    handle_command(&t.state, conn_a, DashboardCommand::AtualizarInfo)
        .await
        .unwrap();

    match rx_a.recv().await {
        Some(DashboardEvent::Info(info)) => {
            assert_eq!(info.pushname, "Leo");
            assert_eq!(info.user, "5511999999999");
        }
        other => panic!("expected info event, got {other:?}"),
    }
    assert!(rx_b.try_recv().is_err());
}

/// Without a cached account snapshot the refresh emits nothing.
#[tokio::test]
async fn test_refresh_info_without_account_is_silent() {
    let t = test_app();
    let (conn_id, mut rx) = t.hub.register_connection();

    handle_command(&t.state, conn_id, DashboardCommand::AtualizarInfo)
        .await
        .unwrap();

    assert!(rx.try_recv().is_err());
}

/// Late joiners always learn the current connectivity immediately.
#[tokio::test]
async fn test_late_joiner_receives_current_status() {
    let t = connected_app().await;

    let (conn_id, mut rx) = t.hub.register_connection();
    t.wa.announce_snapshot(conn_id).await;
    assert!(matches!(
        rx.recv().await,
        Some(DashboardEvent::ConnectionStatus(true))
    ));

    // And a joiner on a fresh, disconnected relay sees `false`.
    let fresh = test_app();
    let (conn_id, mut rx) = fresh.hub.register_connection();
    fresh.wa.announce_snapshot(conn_id).await;
    assert!(matches!(
        rx.recv().await,
        Some(DashboardEvent::ConnectionStatus(false))
    ));
}
