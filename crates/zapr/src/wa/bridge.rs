//! Evolution-API-compatible WhatsApp bridge client.
//!
//! This is the production [`WaClient`]: it drives a WhatsApp automation
//! bridge over HTTP. Instance create/connect yields the pairing QR as a
//! base64 data URL; a poll loop watches the connection state and raises
//! lifecycle events; sends and chat queries are plain REST calls.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use log::{info, warn};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::client::{ClientEvent, WaClient};
use super::error::{WaError, WaResult};
use super::models::{AccountInfo, Chat};

/// Configuration for the bridge connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Base URL of the bridge API.
    pub api_url: String,
    /// API key sent on every request.
    pub api_key: String,
    /// Name of the single instance this relay manages.
    pub instance_name: String,
    /// Timeout applied to every bridge request, in seconds. 0 disables the
    /// timeout and restores the upstream block-forever behavior.
    pub request_timeout_secs: u64,
    /// Cadence of the connection-state poll, in seconds.
    pub poll_interval_secs: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8080".to_string(),
            api_key: String::new(),
            instance_name: "zapr".to_string(),
            request_timeout_secs: 30,
            poll_interval_secs: 5,
        }
    }
}

pub struct BridgeClient {
    config: BridgeConfig,
    http: reqwest::Client,
    /// Where the opaque session payload is persisted after pairing.
    artifact_path: PathBuf,
    /// Handle of the running state-poll task, aborted on teardown.
    poll_task: Mutex<Option<JoinHandle<()>>>,
}

impl BridgeClient {
    pub fn new(config: BridgeConfig, artifact_path: impl Into<PathBuf>) -> WaResult<Self> {
        let mut builder = reqwest::Client::builder();
        if config.request_timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.request_timeout_secs));
        }
        let http = builder.build()?;

        Ok(Self {
            config,
            http,
            artifact_path: artifact_path.into(),
            poll_task: Mutex::new(None),
        })
    }

    /// Create the instance on the bridge and return the pairing QR, if any.
    async fn create_instance(&self) -> WaResult<String> {
        let url = format!("{}/instance/create", self.config.api_url);
        // Unique token per instance to avoid collisions with stale instances.
        let token = format!("zapr-{}", &Uuid::new_v4().simple().to_string()[..12]);
        let body = json!({
            "instanceName": self.config.instance_name,
            "token": token,
            "qrcode": true,
        });

        info!("Creating bridge instance '{}'", self.config.instance_name);
        let resp = self
            .http
            .post(&url)
            .header("apikey", &self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(WaError::AuthFailure(format!(
                "bridge rejected the API key ({status})"
            )));
        }

        let text = resp.text().await?;
        if !status.is_success() {
            let lower = text.to_lowercase();
            if lower.contains("already") || lower.contains("exists") {
                // Instance survives from an earlier run; connect to it instead.
                info!("Instance already exists; connecting to it");
                return self.connect_instance().await;
            }
            return Err(WaError::Query(format!(
                "instance create failed ({status}): {text}"
            )));
        }

        let resp_json: Value = serde_json::from_str(&text).unwrap_or_default();
        Ok(extract_qr(&resp_json))
    }

    /// Connect to an existing instance, returning a fresh QR if the bridge
    /// wants the user to pair again.
    async fn connect_instance(&self) -> WaResult<String> {
        let url = format!(
            "{}/instance/connect/{}",
            self.config.api_url, self.config.instance_name
        );
        let resp = self
            .http
            .get(&url)
            .header("apikey", &self.config.api_key)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(WaError::Query(format!(
                "instance connect failed ({status}): {text}"
            )));
        }

        let resp_json: Value = serde_json::from_str(&text).unwrap_or_default();
        Ok(extract_qr(&resp_json))
    }
}

#[async_trait]
impl WaClient for BridgeClient {
    async fn initialize(&self, events: mpsc::Sender<ClientEvent>) -> WaResult<()> {
        // Supersede any poll loop left over from a previous attempt.
        if let Some(task) = self.poll_task.lock().await.take() {
            task.abort();
        }

        let qr = if self.artifact_path.exists() {
            // A persisted session means the bridge can resume without pairing;
            // it may still hand back a QR if the session was invalidated.
            match self.connect_instance().await {
                Ok(qr) => qr,
                Err(e) => {
                    warn!("Resume failed ({}); creating a fresh instance", e);
                    self.create_instance().await?
                }
            }
        } else {
            self.create_instance().await?
        };

        if !qr.is_empty() {
            info!("QR code issued; waiting for scan");
            let _ = events.send(ClientEvent::Qr { image: qr }).await;
        }

        let task = tokio::spawn(run_state_poll(
            self.http.clone(),
            self.config.clone(),
            self.artifact_path.clone(),
            events,
        ));
        *self.poll_task.lock().await = Some(task);

        Ok(())
    }

    async fn send_message(&self, target: &str, text: &str) -> WaResult<()> {
        let url = format!(
            "{}/message/sendText/{}",
            self.config.api_url, self.config.instance_name
        );
        let body = json!({
            "number": target,
            "text": text,
        });

        let resp = self
            .http
            .post(&url)
            .header("apikey", &self.config.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let detail = resp.text().await.unwrap_or_default();
            return Err(WaError::Send(format!("{status}: {detail}")));
        }
        Ok(())
    }

    async fn list_chats(&self) -> WaResult<Vec<Chat>> {
        let url = format!(
            "{}/chat/findChats/{}",
            self.config.api_url, self.config.instance_name
        );
        let resp = self
            .http
            .post(&url)
            .header("apikey", &self.config.api_key)
            .json(&json!({}))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let detail = resp.text().await.unwrap_or_default();
            return Err(WaError::Query(format!("{status}: {detail}")));
        }

        let body: Value = resp.json().await?;
        Ok(parse_chats(&body))
    }

    async fn destroy(&self) -> WaResult<()> {
        if let Some(task) = self.poll_task.lock().await.take() {
            task.abort();
        }

        // Logout then delete; a missing instance is not an error.
        for action in ["logout", "delete"] {
            let url = format!(
                "{}/instance/{}/{}",
                self.config.api_url, action, self.config.instance_name
            );
            match self
                .http
                .delete(&url)
                .header("apikey", &self.config.api_key)
                .send()
                .await
            {
                Ok(resp) if !resp.status().is_success() => {
                    warn!(
                        "Instance {} returned {} (ignored)",
                        action,
                        resp.status()
                    );
                }
                Ok(_) => {}
                Err(e) => warn!("Instance {} failed: {} (ignored)", action, e),
            }
        }
        Ok(())
    }
}

/// Watch the bridge connection state and translate it into lifecycle events.
///
/// The loop ends when the session disconnects, when pairing is refused, or
/// when the adapter drops its receiver; a new `initialize` starts a new loop.
async fn run_state_poll(
    http: reqwest::Client,
    config: BridgeConfig,
    artifact_path: PathBuf,
    events: mpsc::Sender<ClientEvent>,
) {
    let mut interval =
        tokio::time::interval(Duration::from_secs(config.poll_interval_secs.max(1)));
    let mut connected = false;

    loop {
        interval.tick().await;
        if events.is_closed() {
            break;
        }

        let url = format!(
            "{}/instance/connectionState/{}",
            config.api_url, config.instance_name
        );
        let body: Value = match http
            .get(&url)
            .header("apikey", &config.api_key)
            .send()
            .await
        {
            Ok(resp) => match resp.json().await {
                Ok(body) => body,
                Err(e) => {
                    warn!("Connection state parse failed: {}", e);
                    continue;
                }
            },
            Err(e) => {
                warn!("Connection check failed: {}", e);
                continue;
            }
        };

        let state = body["instance"]["state"]
            .as_str()
            .or_else(|| body["state"].as_str())
            .unwrap_or("");

        match state {
            "open" | "connected" if !connected => {
                connected = true;
                persist_artifact(&artifact_path, &body);
                let _ = events
                    .send(ClientEvent::Authenticated {
                        session: body.clone(),
                    })
                    .await;
                let info = fetch_account_info(&http, &config).await;
                let _ = events.send(ClientEvent::Ready { info }).await;
            }
            "refused" => {
                let _ = events
                    .send(ClientEvent::AuthFailure {
                        reason: "pairing refused by the remote service".to_string(),
                    })
                    .await;
                break;
            }
            "close" | "closed" | "disconnected" if connected => {
                let _ = events
                    .send(ClientEvent::Disconnected {
                        reason: state.to_string(),
                    })
                    .await;
                break;
            }
            // Before the first "open", close states just mean the QR has not
            // been scanned yet.
            _ => {}
        }
    }
}

/// Persist the opaque session payload produced by pairing. Its presence is
/// what lets the next start skip the QR flow.
fn persist_artifact(path: &std::path::Path, payload: &Value) {
    if let Some(parent) = path.parent()
        && let Err(e) = fs::create_dir_all(parent)
    {
        warn!("Could not create session directory: {}", e);
        return;
    }
    match serde_json::to_vec_pretty(payload) {
        Ok(bytes) => {
            if let Err(e) = fs::write(path, bytes) {
                warn!("Could not persist session artifact: {}", e);
            } else {
                info!("Session artifact written to {}", path.display());
            }
        }
        Err(e) => warn!("Could not serialize session payload: {}", e),
    }
}

/// Fetch the account snapshot for the connected instance.
async fn fetch_account_info(http: &reqwest::Client, config: &BridgeConfig) -> AccountInfo {
    let url = format!(
        "{}/instance/fetchInstances?instanceName={}",
        config.api_url, config.instance_name
    );
    let body: Value = match http
        .get(&url)
        .header("apikey", &config.api_key)
        .send()
        .await
    {
        Ok(resp) => resp.json().await.unwrap_or_default(),
        Err(e) => {
            warn!("Account info fetch failed: {}", e);
            Value::Null
        }
    };
    parse_account_info(&body, &config.instance_name)
}

/// Extract the QR base64 data URL from the bridge's response formats.
fn extract_qr(resp: &Value) -> String {
    resp["qrcode"]["base64"]
        .as_str()
        .or_else(|| resp["base64"].as_str())
        .or_else(|| resp["qrcode"].as_str().filter(|s| s.starts_with("data:")))
        .unwrap_or("")
        .to_string()
}

/// Parse the instance description into an account snapshot.
fn parse_account_info(resp: &Value, instance_name: &str) -> AccountInfo {
    // fetchInstances returns either an array of {instance: {...}} wrappers or
    // a single object, depending on the bridge version.
    let instance = resp
        .as_array()
        .and_then(|list| list.first())
        .map(|entry| &entry["instance"])
        .unwrap_or(&resp["instance"]);

    let pushname = instance["profileName"]
        .as_str()
        .or_else(|| instance["pushName"].as_str())
        .unwrap_or(instance_name)
        .to_string();
    let user = instance["owner"]
        .as_str()
        .unwrap_or("")
        .trim_end_matches("@s.whatsapp.net")
        .to_string();
    let platform = instance["platform"].as_str().unwrap_or("unknown").to_string();

    AccountInfo {
        pushname,
        user,
        platform,
    }
}

/// Parse the chat list, deriving the group flag from the JID when the bridge
/// does not send one.
fn parse_chats(resp: &Value) -> Vec<Chat> {
    let entries = resp
        .as_array()
        .or_else(|| resp["chats"].as_array())
        .cloned()
        .unwrap_or_default();

    entries
        .iter()
        .filter_map(|entry| {
            let id = entry["id"]
                .as_str()
                .or_else(|| entry["remoteJid"].as_str())?
                .to_string();
            let name = entry["name"]
                .as_str()
                .or_else(|| entry["subject"].as_str())
                .or_else(|| entry["pushName"].as_str())
                .unwrap_or(&id)
                .to_string();
            let is_group = entry["isGroup"]
                .as_bool()
                .unwrap_or_else(|| id.ends_with("@g.us"));
            Some(Chat { id, name, is_group })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_qr_handles_bridge_response_shapes() {
        let nested = json!({"qrcode": {"base64": "data:image/png;base64,AAA"}});
        assert_eq!(extract_qr(&nested), "data:image/png;base64,AAA");

        let flat = json!({"base64": "data:image/png;base64,BBB"});
        assert_eq!(extract_qr(&flat), "data:image/png;base64,BBB");

        let direct = json!({"qrcode": "data:image/png;base64,CCC"});
        assert_eq!(extract_qr(&direct), "data:image/png;base64,CCC");

        // A raw challenge string is never passed through as an image.
        let raw = json!({"qrcode": "2@abcdef"});
        assert_eq!(extract_qr(&raw), "");
    }

    #[test]
    fn test_parse_account_info_from_instance_list() {
        let body = json!([{
            "instance": {
                "instanceName": "zapr",
                "profileName": "Leo",
                "owner": "5511999999999@s.whatsapp.net",
                "platform": "android"
            }
        }]);
        let info = parse_account_info(&body, "zapr");
        assert_eq!(info.pushname, "Leo");
        assert_eq!(info.user, "5511999999999");
        assert_eq!(info.platform, "android");
    }

    #[test]
    fn test_parse_account_info_falls_back_to_instance_name() {
        let info = parse_account_info(&Value::Null, "zapr");
        assert_eq!(info.pushname, "zapr");
        assert_eq!(info.user, "");
        assert_eq!(info.platform, "unknown");
    }

    #[test]
    fn test_parse_chats_derives_group_flag_from_jid() {
        let body = json!([
            {"id": "123@g.us", "name": "Equipe"},
            {"id": "5511999999999@s.whatsapp.net", "name": "Leo"},
            {"remoteJid": "456@g.us", "subject": "Clientes"}
        ]);
        let chats = parse_chats(&body);
        assert_eq!(chats.len(), 3);
        assert!(chats[0].is_group);
        assert!(!chats[1].is_group);
        assert!(chats[2].is_group);
        assert_eq!(chats[2].name, "Clientes");
    }

    #[test]
    fn test_parse_chats_honors_explicit_group_flag() {
        let body = json!([{"id": "odd-id", "name": "Grupo", "isGroup": true}]);
        let chats = parse_chats(&body);
        assert!(chats[0].is_group);
    }
}
