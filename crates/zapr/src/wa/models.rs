//! Data model for the WhatsApp relay: connection state and the read-only
//! snapshots projected out of the automation bridge.

use serde::{Deserialize, Serialize};

/// Connectivity of the single automation-client instance.
///
/// There is exactly one of these per process, owned by the service. It is
/// never persisted; a restart always begins `Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        };
        f.write_str(s)
    }
}

/// Account snapshot captured when the client becomes ready.
///
/// Field names are part of the dashboard wire contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub pushname: String,
    pub user: String,
    pub platform: String,
}

/// A chat entry as reported by the automation bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: String,
    pub name: String,
    pub is_group: bool,
}

/// Projection of a group chat exposed to callers of the list operation.
///
/// Computed on demand from the full chat list; never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub id: String,
    pub name: String,
}

impl From<&Chat> for GroupSummary {
    fn from(chat: &Chat) -> Self {
        Self {
            id: chat.id.clone(),
            name: chat.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_disconnected() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
        assert!(!ConnectionState::default().is_connected());
    }

    #[test]
    fn test_group_summary_projection() {
        let chat = Chat {
            id: "123@g.us".to_string(),
            name: "Equipe".to_string(),
            is_group: true,
        };
        let summary = GroupSummary::from(&chat);
        assert_eq!(summary.id, "123@g.us");
        assert_eq!(summary.name, "Equipe");
    }

    #[test]
    fn test_group_summary_serializes_to_id_name_only() {
        let summary = GroupSummary {
            id: "123@g.us".to_string(),
            name: "Equipe".to_string(),
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json, serde_json::json!({"id": "123@g.us", "name": "Equipe"}));
    }
}
