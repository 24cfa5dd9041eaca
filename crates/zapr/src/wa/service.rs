//! Automation-client adapter and connection state machine.
//!
//! `WaService` is the single point of contact with the external automation
//! client. It owns the process-wide [`ConnectionState`], caches the account
//! snapshot, and pumps client lifecycle events into dashboard broadcasts.

use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::sync::{Mutex, RwLock, mpsc};

use crate::ws::{DashboardEvent, WsHub};

use super::client::{ClientEvent, WaClient};
use super::error::{WaError, WaResult};
use super::models::{AccountInfo, ConnectionState, GroupSummary};
use super::session::SessionStore;

/// Buffer for lifecycle events between the client and the pump task.
const CLIENT_EVENT_BUFFER_SIZE: usize = 32;

pub struct WaService {
    client: Arc<dyn WaClient>,
    hub: Arc<WsHub>,
    session: SessionStore,
    state: RwLock<ConnectionState>,
    account: RwLock<Option<AccountInfo>>,
    /// Serializes connect/disconnect transitions so only one is in flight.
    transition: Mutex<()>,
}

impl WaService {
    pub fn new(client: Arc<dyn WaClient>, hub: Arc<WsHub>, session: SessionStore) -> Arc<Self> {
        Arc::new(Self {
            client,
            hub,
            session,
            state: RwLock::new(ConnectionState::Disconnected),
            account: RwLock::new(None),
            transition: Mutex::new(()),
        })
    }

    /// Current connectivity, for late-joining subscribers.
    pub async fn connection_snapshot(&self) -> ConnectionState {
        *self.state.read().await
    }

    /// Cached account snapshot, if the client has been ready this session.
    pub async fn account_info(&self) -> Option<AccountInfo> {
        self.account.read().await.clone()
    }

    /// Send the current connectivity boolean to one specific connection.
    pub async fn announce_snapshot(&self, conn_id: usize) {
        let connected = self.connection_snapshot().await.is_connected();
        self.hub
            .send_to(conn_id, DashboardEvent::ConnectionStatus(connected))
            .await;
    }

    /// Start the external client's connection sequence.
    ///
    /// A call while already connecting or connected is logged and ignored,
    /// so repeated dashboard clicks never spawn a second client.
    pub async fn initialize(self: &Arc<Self>) -> WaResult<()> {
        let _guard = self.transition.lock().await;

        let current = *self.state.read().await;
        if current != ConnectionState::Disconnected {
            debug!("initialize ignored; client is already {}", current);
            return Ok(());
        }

        if self.session.exists() {
            info!(
                "Session artifact present at {}; pairing will be skipped",
                self.session.path().display()
            );
        }

        *self.state.write().await = ConnectionState::Connecting;

        let (tx, rx) = mpsc::channel(CLIENT_EVENT_BUFFER_SIZE);
        if let Err(e) = self.client.initialize(tx).await {
            *self.state.write().await = ConnectionState::Disconnected;
            return Err(e);
        }

        let service = self.clone();
        tokio::spawn(async move {
            service.run_event_pump(rx).await;
        });

        Ok(())
    }

    /// Send a text message to an individual recipient.
    pub async fn send_direct_message(&self, target: &str, text: &str) -> WaResult<()> {
        if !self.connection_snapshot().await.is_connected() {
            return Err(WaError::NotConnected);
        }
        self.client
            .send_message(target, text)
            .await
            .map_err(WaError::into_send)
    }

    /// Send a text message to a group, verifying the target actually is one.
    pub async fn send_group_message(&self, group_id: &str, text: &str) -> WaResult<()> {
        if !self.connection_snapshot().await.is_connected() {
            return Err(WaError::NotConnected);
        }

        let chats = self
            .client
            .list_chats()
            .await
            .map_err(WaError::into_query)?;
        let is_group = chats.iter().any(|c| c.id == group_id && c.is_group);
        if !is_group {
            return Err(WaError::InvalidTarget(group_id.to_string()));
        }

        self.client
            .send_message(group_id, text)
            .await
            .map_err(WaError::into_send)
    }

    /// List the client's group chats, projected to id + name.
    pub async fn list_groups(&self) -> WaResult<Vec<GroupSummary>> {
        if !self.connection_snapshot().await.is_connected() {
            return Err(WaError::NotConnected);
        }
        let chats = self
            .client
            .list_chats()
            .await
            .map_err(WaError::into_query)?;
        Ok(chats
            .iter()
            .filter(|c| c.is_group)
            .map(GroupSummary::from)
            .collect())
    }

    /// Tear down the external client and delete the session artifact,
    /// forcing a fresh pairing on the next connect.
    pub async fn disconnect(&self) -> WaResult<()> {
        let _guard = self.transition.lock().await;

        self.client.destroy().await?;
        self.session.delete()?;

        *self.state.write().await = ConnectionState::Disconnected;
        self.account.write().await.take();
        info!("Instance disconnected and session artifact removed");
        Ok(())
    }

    /// Tear down the external client without touching the session artifact.
    /// Used on process shutdown; safe to call when nothing is running.
    pub async fn destroy(&self) -> WaResult<()> {
        let _guard = self.transition.lock().await;
        self.client.destroy().await?;
        *self.state.write().await = ConnectionState::Disconnected;
        self.account.write().await.take();
        Ok(())
    }

    /// Consume client lifecycle events until the client drops its sender.
    async fn run_event_pump(self: Arc<Self>, mut rx: mpsc::Receiver<ClientEvent>) {
        while let Some(event) = rx.recv().await {
            self.apply_event(event).await;
        }
        debug!("Client event channel closed");
    }

    async fn apply_event(&self, event: ClientEvent) {
        match event {
            ClientEvent::Qr { image } => {
                info!("Pairing QR code issued");
                self.hub.broadcast(DashboardEvent::Qr(image));
            }
            ClientEvent::Authenticated { .. } => {
                info!("Client authenticated");
            }
            ClientEvent::Ready { info } => {
                info!("Client ready as {} ({})", info.pushname, info.user);
                *self.state.write().await = ConnectionState::Connected;
                *self.account.write().await = Some(info.clone());
                self.hub.broadcast(DashboardEvent::Info(info));
                self.hub.broadcast(DashboardEvent::ConnectionStatus(true));
            }
            ClientEvent::AuthFailure { reason } => {
                error!("Authentication failed: {}", reason);
                *self.state.write().await = ConnectionState::Disconnected;
                self.account.write().await.take();
                self.hub.broadcast(DashboardEvent::ConnectionStatus(false));
            }
            ClientEvent::Disconnected { reason } => {
                warn!("Client disconnected: {}", reason);
                *self.state.write().await = ConnectionState::Disconnected;
                self.account.write().await.take();
                self.hub.broadcast(DashboardEvent::ConnectionStatus(false));
            }
        }
    }
}
