//! Test utilities and common setup.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use tokio::sync::mpsc;

use zapr::api::{self, AppState};
use zapr::wa::{
    AccountInfo, Chat, ClientEvent, ConnectionState, SessionStore, WaClient, WaError, WaResult,
    WaService,
};
use zapr::ws::WsHub;

/// Stand-in for the external automation bridge.
///
/// `initialize` replays a QR event followed by `Ready`, so driving the
/// service through a full pairing flow needs no network at all.
pub struct FakeBridge {
    pub init_calls: AtomicUsize,
    pub destroy_calls: AtomicUsize,
    pub fail_sends: AtomicBool,
    pub sent: std::sync::Mutex<Vec<(String, String)>>,
    pub chats: Vec<Chat>,
}

impl FakeBridge {
    pub fn new() -> Arc<Self> {
        Self::with_chats(vec![
            Chat {
                id: "123@g.us".to_string(),
                name: "Equipe".to_string(),
                is_group: true,
            },
            Chat {
                id: "5511999999999@s.whatsapp.net".to_string(),
                name: "Leo".to_string(),
                is_group: false,
            },
            Chat {
                id: "456@g.us".to_string(),
                name: "Clientes".to_string(),
                is_group: true,
            },
        ])
    }

    pub fn with_chats(chats: Vec<Chat>) -> Arc<Self> {
        Arc::new(Self {
            init_calls: AtomicUsize::new(0),
            destroy_calls: AtomicUsize::new(0),
            fail_sends: AtomicBool::new(false),
            sent: std::sync::Mutex::new(Vec::new()),
            chats,
        })
    }

    pub fn account_info() -> AccountInfo {
        AccountInfo {
            pushname: "Leo".to_string(),
            user: "5511999999999".to_string(),
            platform: "android".to_string(),
        }
    }
}

#[async_trait]
impl WaClient for FakeBridge {
    async fn initialize(&self, events: mpsc::Sender<ClientEvent>) -> WaResult<()> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        tokio::spawn(async move {
            let _ = events
                .send(ClientEvent::Qr {
                    image: "data:image/png;base64,AAA".to_string(),
                })
                .await;
            let _ = events
                .send(ClientEvent::Ready {
                    info: FakeBridge::account_info(),
                })
                .await;
        });
        Ok(())
    }

    async fn send_message(&self, target: &str, text: &str) -> WaResult<()> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(WaError::Send("rejected by the bridge".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((target.to_string(), text.to_string()));
        Ok(())
    }

    async fn list_chats(&self) -> WaResult<Vec<Chat>> {
        Ok(self.chats.clone())
    }

    async fn destroy(&self) -> WaResult<()> {
        self.destroy_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A fully wired application over the fake bridge.
pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub bridge: Arc<FakeBridge>,
    pub wa: Arc<WaService>,
    pub hub: Arc<WsHub>,
    pub artifact_path: PathBuf,
    _dir: tempfile::TempDir,
}

/// Create a test application in the disconnected state.
pub fn test_app() -> TestApp {
    test_app_with_bridge(FakeBridge::new())
}

pub fn test_app_with_bridge(bridge: Arc<FakeBridge>) -> TestApp {
    let dir = tempfile::tempdir().expect("create test dir");
    let artifact_path = dir.path().join("session.json");

    let hub = Arc::new(WsHub::new());
    let session = SessionStore::new(&artifact_path);
    let wa = WaService::new(bridge.clone(), hub.clone(), session);

    let state = AppState::new(
        wa.clone(),
        hub.clone(),
        dir.path().join("public"),
        Vec::new(),
    );
    let app = api::create_router(state.clone());

    TestApp {
        app,
        state,
        bridge,
        wa,
        hub,
        artifact_path,
        _dir: dir,
    }
}

/// Create a test application that has already paired and connected.
pub async fn connected_app() -> TestApp {
    let t = test_app();
    // The artifact a real pairing flow would have left behind.
    std::fs::write(&t.artifact_path, "{}").expect("write artifact");
    t.wa.initialize().await.expect("initialize");
    wait_for_state(&t.wa, ConnectionState::Connected).await;
    t
}

pub async fn wait_for_state(wa: &WaService, want: ConnectionState) {
    for _ in 0..100 {
        if wa.connection_snapshot().await == want {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("state never reached {want}");
}
