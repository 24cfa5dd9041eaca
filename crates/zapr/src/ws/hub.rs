//! WebSocket hub for managing dashboard connections and broadcasting events.

use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use log::{debug, warn};
use tokio::sync::{broadcast, mpsc};

use super::types::DashboardEvent;

/// Size of the broadcast channel for events.
const EVENT_BUFFER_SIZE: usize = 256;

/// Size of the per-connection send buffer.
const CONNECTION_BUFFER_SIZE: usize = 64;

/// A sender for events targeted at a specific dashboard connection.
pub type WsSender = mpsc::Sender<DashboardEvent>;

/// Hub fanning out relay events to all connected dashboards.
///
/// Broadcast events reach every subscriber; the per-connection senders exist
/// for targeted emits (the status snapshot a late joiner receives, and
/// request-scoped replies like the account-info refresh).
pub struct WsHub {
    /// Connection ID -> sender for that connection.
    connections: DashMap<usize, WsSender>,

    /// Monotonic connection ID source.
    next_conn_id: AtomicUsize,

    /// Broadcast channel for hub-wide events.
    event_tx: broadcast::Sender<DashboardEvent>,
}

impl WsHub {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_BUFFER_SIZE);
        Self {
            connections: DashMap::new(),
            next_conn_id: AtomicUsize::new(0),
            event_tx,
        }
    }

    /// Register a new dashboard connection.
    ///
    /// Returns the connection ID and a receiver for events targeted at it.
    pub fn register_connection(&self) -> (usize, mpsc::Receiver<DashboardEvent>) {
        let (tx, rx) = mpsc::channel(CONNECTION_BUFFER_SIZE);
        let conn_id = self.next_conn_id.fetch_add(1, Ordering::Relaxed);
        self.connections.insert(conn_id, tx);
        debug!("Registered dashboard connection {}", conn_id);
        (conn_id, rx)
    }

    /// Unregister a dashboard connection.
    pub fn unregister_connection(&self, conn_id: usize) {
        self.connections.remove(&conn_id);
        debug!("Unregistered dashboard connection {}", conn_id);
    }

    /// Send an event to one specific connection.
    pub async fn send_to(&self, conn_id: usize, event: DashboardEvent) {
        // Clone the sender out of the map; holding the shard lock across an
        // await would block every other connection.
        let tx = self.connections.get(&conn_id).map(|entry| entry.value().clone());
        if let Some(tx) = tx {
            if tx.send(event).await.is_err() {
                warn!("Failed to send event to connection {}", conn_id);
            }
        }
    }

    /// Broadcast an event to every connected dashboard.
    ///
    /// A send error only means there are currently no subscribers.
    pub fn broadcast(&self, event: DashboardEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Subscribe to the broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.event_tx.subscribe()
    }

    /// Number of currently connected dashboards.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

impl Default for WsHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_to_reaches_only_target_connection() {
        let hub = WsHub::new();
        let (id_a, mut rx_a) = hub.register_connection();
        let (_id_b, mut rx_b) = hub.register_connection();

        hub.send_to(id_a, DashboardEvent::ConnectionStatus(true)).await;

        assert!(matches!(
            rx_a.recv().await,
            Some(DashboardEvent::ConnectionStatus(true))
        ));
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_reaches_all_subscribers() {
        let hub = WsHub::new();
        let mut sub_a = hub.subscribe();
        let mut sub_b = hub.subscribe();

        hub.broadcast(DashboardEvent::Desconectado);

        assert!(matches!(sub_a.recv().await, Ok(DashboardEvent::Desconectado)));
        assert!(matches!(sub_b.recv().await, Ok(DashboardEvent::Desconectado)));
    }

    #[tokio::test]
    async fn test_unregister_drops_connection() {
        let hub = WsHub::new();
        let (conn_id, _rx) = hub.register_connection();
        assert_eq!(hub.connection_count(), 1);
        hub.unregister_connection(conn_id);
        assert_eq!(hub.connection_count(), 0);
    }
}
