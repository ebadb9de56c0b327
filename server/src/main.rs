use anyhow::Context;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use gamehost_protocol::{ClientToServer, ErrorReason, ServerToClient};
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use tracing::{info, warn};

mod broadcast;
mod dispatch;
mod host;
mod registry;

use host::HostStateStore;
use registry::ConnectionRegistry;

/// Everything behind the single authoritative lock: who is connected and
/// what the world looks like. Command processing takes the lock for the
/// whole mutate-then-broadcast step, which is what serializes commands.
pub struct Host {
    pub registry: ConnectionRegistry,
    pub store: HostStateStore,
}

#[derive(Clone)]
pub struct AppState {
    inner: Arc<Mutex<Host>>,
}

impl AppState {
    pub fn new() -> Self {
        AppState {
            inner: Arc::new(Mutex::new(Host {
                registry: ConnectionRegistry::new(),
                store: HostStateStore::new(),
            })),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, Host> {
        self.inner.lock()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "9001".into())
        .parse()
        .context("invalid PORT")?;

    let state = AppState::new();
    let app = Router::new()
        .route("/ws", get(ws_handler))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .context("failed to bind")?;
    info!(%port, "game host listening");
    axum::serve(listener, app).await.context("server failed")?;
    Ok(())
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    let (tx_out, mut rx_out) = tokio::sync::mpsc::unbounded_channel::<ServerToClient>();

    // Writer pump: drains this connection's outbound queue so a slow peer
    // never blocks command processing.
    tokio::spawn(async move {
        while let Some(msg) = rx_out.recv().await {
            let text = match serde_json::to_string(&msg) {
                Ok(text) => text,
                Err(_) => continue,
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let my_id = dispatch::connect(&state, &tx_out);

    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => match serde_json::from_str::<ClientToServer>(&text) {
                Ok(cmd) => dispatch::handle(&state, my_id, cmd),
                Err(_) => {
                    warn!(client = my_id, "malformed command frame");
                    dispatch::reject(&state, my_id, "unknown", ErrorReason::Malformed);
                }
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    // Reached on a clean close, a transport error, or a vanished peer
    // alike; the store treats a second eviction as a no-op.
    dispatch::disconnect(&state, my_id);
}
