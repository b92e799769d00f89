//! Test helpers for integration tests
//!
//! Spawns a gateway on an ephemeral port over an in-memory directory and
//! provides a minimal WebSocket client for driving it.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use aeon_common::{TelegramAuth, WebSocketConfig};
use aeon_core::{ChatId, TelegramId};
use aeon_db::MemoryDirectory;
use aeon_gateway::handlers::Handshake;
use aeon_gateway::{create_app, GatewayState, ServerEvent};
use anyhow::{bail, Context, Result};
use futures_util::{SinkExt, StreamExt};
use reqwest::Client;
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::fixtures::{init_data_for, TestUser, BOT_TOKEN};

/// How long a client waits for the next event before failing
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Test gateway instance that manages lifecycle
pub struct TestGateway {
    pub addr: SocketAddr,
    pub client: Client,
    pub directory: Arc<MemoryDirectory>,
    pub state: GatewayState,
    pub auth: TelegramAuth,
    _handle: JoinHandle<()>,
}

impl TestGateway {
    /// Start a new test gateway with default socket settings
    pub async fn start() -> Result<Self> {
        Self::start_with_settings(WebSocketConfig::default()).await
    }

    /// Start a test gateway with custom socket settings
    pub async fn start_with_settings(settings: WebSocketConfig) -> Result<Self> {
        let directory = Arc::new(MemoryDirectory::new());
        let auth = TelegramAuth::new(BOT_TOKEN)?;
        let handshake = Handshake::new(
            auth.clone(),
            directory.clone(),
            settings.handshake_timeout(),
        );
        let state = GatewayState::new(handshake, directory.clone(), settings);

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let app = create_app(state.clone());
        let handle = tokio::spawn(async move {
            aeon_gateway::server::serve(listener, app).await.ok();
        });

        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            addr,
            client,
            directory,
            state,
            auth,
            _handle: handle,
        })
    }

    /// Get base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Register a fresh user in the directory
    pub fn user(&self) -> TestUser {
        let user = TestUser::unique();
        self.directory.add_user(user.telegram_id, user.user_id);
        user
    }

    /// Record durable membership of users in a chat
    pub fn add_members(&self, chat_id: ChatId, users: &[TestUser]) {
        for user in users {
            self.directory.add_member(chat_id, user.user_id);
        }
    }

    /// Socket URL carrying the given raw init data
    pub fn ws_url(&self, init_data: Option<&str>) -> String {
        match init_data {
            Some(raw) => {
                let query = url::form_urlencoded::Serializer::new(String::new())
                    .append_pair("init_data", raw)
                    .finish();
                format!("ws://{}/ws?{query}", self.addr)
            }
            None => format!("ws://{}/ws", self.addr),
        }
    }

    /// Open a socket with arbitrary init data without waiting for the greeting
    pub async fn connect_raw(&self, init_data: Option<&str>) -> Result<WsClient> {
        let (stream, _) = connect_async(self.ws_url(init_data))
            .await
            .context("WebSocket connect failed")?;
        Ok(WsClient { stream })
    }

    /// Open a socket as `telegram_id` and consume the greeting
    pub async fn connect(&self, telegram_id: TelegramId) -> Result<WsClient> {
        let init_data = init_data_for(&self.auth, telegram_id);
        let mut client = self.connect_raw(Some(&init_data)).await?;
        match client.next_event().await? {
            ServerEvent::ConnectionEstablished { .. } => Ok(client),
            other => bail!("Expected connection_established, got {other:?}"),
        }
    }
}

/// Minimal gateway client
pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsClient {
    /// Send a JSON frame
    pub async fn send_json(&mut self, value: &Value) -> Result<()> {
        self.send_text(&value.to_string()).await
    }

    /// Send a raw text frame
    pub async fn send_text(&mut self, text: &str) -> Result<()> {
        self.stream.send(Message::Text(text.to_string())).await?;
        Ok(())
    }

    /// Wait for the next server event
    pub async fn next_event(&mut self) -> Result<ServerEvent> {
        loop {
            let msg = tokio::time::timeout(EVENT_TIMEOUT, self.stream.next())
                .await
                .context("Timed out waiting for an event")?
                .context("Socket ended")??;
            match msg {
                Message::Text(text) => return Ok(ServerEvent::from_json(&text)?),
                Message::Close(frame) => bail!("Socket closed: {frame:?}"),
                _ => {}
            }
        }
    }

    /// Send a ping and return everything received before the pong
    ///
    /// The gateway handles a socket's frames in order, so anything addressed
    /// to this client before the ping was processed shows up first.
    pub async fn events_until_pong(&mut self) -> Result<Vec<ServerEvent>> {
        self.send_json(&serde_json::json!({"type": "ping"})).await?;
        let mut events = Vec::new();
        loop {
            match self.next_event().await? {
                ServerEvent::Pong => return Ok(events),
                event => events.push(event),
            }
        }
    }

    /// Wait for the server to close the socket and return the close code
    pub async fn close_code(&mut self) -> Result<u16> {
        loop {
            let msg = tokio::time::timeout(EVENT_TIMEOUT, self.stream.next())
                .await
                .context("Timed out waiting for close")?
                .context("Socket ended without a close frame")??;
            match msg {
                Message::Close(Some(frame)) => return Ok(u16::from(frame.code)),
                Message::Close(None) => bail!("Close frame without a code"),
                _ => {}
            }
        }
    }

    /// Close the socket from the client side
    pub async fn close(mut self) -> Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}

/// Check that a health probe answers
pub async fn health_ok(gateway: &TestGateway) -> Result<bool> {
    let response = gateway
        .client
        .get(format!("{}/health", gateway.base_url()))
        .send()
        .await?;
    Ok(response.status().is_success() && response.text().await? == "OK")
}
