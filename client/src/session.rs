//! Transport session: owns the websocket lifecycle, a writer pump for
//! outgoing commands and a reader pump that is the sole writer of the
//! client state mirror.

use futures::{SinkExt, StreamExt};
use gamehost_protocol::{ClientToServer, ErrorReason, HostState, ServerToClient};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use url::Url;

use crate::mirror::ClientStateMirror;

#[derive(Debug, Error)]
pub enum SessionError {
    /// The link is down; the command was dropped, not queued.
    #[error("not connected")]
    NotConnected,
    #[error("invalid server url: {0}")]
    BadUrl(#[from] url::ParseError),
    #[error("websocket error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
}

type UpdateCallback = Box<dyn Fn(&HostState) + Send + Sync>;
type ErrorCallback = Box<dyn Fn(&str, ErrorReason) + Send + Sync>;

struct Shared {
    connected: AtomicBool,
    on_update: Mutex<Option<UpdateCallback>>,
    on_error: Mutex<Option<ErrorCallback>>,
}

/// A live connection to the game host. Dropping the session closes it.
/// Reconnection means a brand-new session and a brand-new identity; there
/// is no resumption.
pub struct Session {
    out: mpsc::UnboundedSender<ClientToServer>,
    shared: Arc<Shared>,
    mirror: Arc<ClientStateMirror>,
}

impl Session {
    /// Perform the handshake and spawn both pumps. Returns once the
    /// socket is up; `welcome` and the initial snapshot arrive through
    /// the mirror shortly after.
    pub async fn connect(
        url: &str,
        mirror: Arc<ClientStateMirror>,
    ) -> Result<Session, SessionError> {
        let parsed = Url::parse(url)?;
        let (ws, _) = connect_async(parsed.as_str()).await?;
        info!(%parsed, "connected");
        let (mut write, mut read) = ws.split();

        let (out, mut rx_out) = mpsc::unbounded_channel::<ClientToServer>();
        let shared = Arc::new(Shared {
            connected: AtomicBool::new(true),
            on_update: Mutex::new(None),
            on_error: Mutex::new(None),
        });

        // Writer pump: drains the command queue onto the socket.
        let shared_w = shared.clone();
        tokio::spawn(async move {
            while let Some(cmd) = rx_out.recv().await {
                let text = match serde_json::to_string(&cmd) {
                    Ok(text) => text,
                    Err(_) => continue,
                };
                if write.send(Message::Text(text)).await.is_err() {
                    shared_w.connected.store(false, Ordering::SeqCst);
                    break;
                }
            }
        });

        // Reader pump: applies server events to the mirror and fires the
        // registered callbacks in receipt order.
        let shared_r = shared.clone();
        let mirror_r = mirror.clone();
        tokio::spawn(async move {
            while let Some(msg) = read.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        match serde_json::from_str::<ServerToClient>(&text) {
                            Ok(event) => receive(&shared_r, &mirror_r, event),
                            Err(_) => warn!("unreadable server frame"),
                        }
                    }
                    Ok(Message::Close(_)) | Err(_) => break,
                    _ => {}
                }
            }
            mirror_r.connection_lost();
            shared_r.connected.store(false, Ordering::SeqCst);
            info!("connection closed");
        });

        Ok(Session { out, shared, mirror })
    }

    pub fn connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    pub fn mirror(&self) -> &ClientStateMirror {
        &self.mirror
    }

    /// Enqueue a command for the server. Fails fast while disconnected so
    /// a stale command can never fire into a future session.
    pub fn send(&self, cmd: ClientToServer) -> Result<(), SessionError> {
        if !self.connected() {
            return Err(SessionError::NotConnected);
        }
        self.out.send(cmd).map_err(|_| SessionError::NotConnected)
    }

    /// Register the snapshot handler, invoked once per `stateUpdate` in
    /// receipt order, after the mirror has been updated.
    pub fn on_state_update(&self, callback: impl Fn(&HostState) + Send + Sync + 'static) {
        *self.shared.on_update.lock() = Some(Box::new(callback));
    }

    /// Register the handler for `commandError` events addressed to us.
    pub fn on_command_error(&self, callback: impl Fn(&str, ErrorReason) + Send + Sync + 'static) {
        *self.shared.on_error.lock() = Some(Box::new(callback));
    }
}

fn receive(shared: &Shared, mirror: &ClientStateMirror, event: ServerToClient) {
    match event {
        ServerToClient::Welcome { your_id } => {
            debug!(client = your_id, "welcome");
            mirror.set_client_id(your_id);
        }
        ServerToClient::StateUpdate { snapshot } => {
            mirror.apply_snapshot(snapshot.clone());
            if let Some(callback) = shared.on_update.lock().as_ref() {
                callback(&snapshot);
            }
        }
        ServerToClient::CommandError { command, reason } => {
            warn!(command, %reason, "command rejected");
            if let Some(callback) = shared.on_error.lock().as_ref() {
                callback(&command, reason);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn settle<F: Fn() -> bool>(ready: F) {
        for _ in 0..100 {
            if ready() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    #[tokio::test]
    async fn events_flow_into_mirror_and_callbacks() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            // give the client a moment to register its callbacks
            tokio::time::sleep(Duration::from_millis(150)).await;
            let welcome =
                serde_json::to_string(&ServerToClient::Welcome { your_id: 42 }).unwrap();
            ws.send(Message::Text(welcome)).await.unwrap();
            let update = serde_json::to_string(&ServerToClient::StateUpdate {
                snapshot: HostState::default(),
            })
            .unwrap();
            ws.send(Message::Text(update)).await.unwrap();
            tokio::time::sleep(Duration::from_millis(300)).await;
            let _ = ws.close(None).await;
        });

        let mirror = Arc::new(ClientStateMirror::detached());
        let session = Session::connect(&format!("ws://{addr}"), mirror.clone())
            .await
            .unwrap();
        assert!(session.connected());

        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
        session.on_state_update(move |snapshot| {
            let _ = seen_tx.send(snapshot.clone());
        });

        let snapshot = tokio::time::timeout(Duration::from_secs(2), seen_rx.recv())
            .await
            .expect("no state update within 2s")
            .unwrap();
        assert_eq!(snapshot, HostState::default());
        assert_eq!(mirror.this_client_id(), Some(42));
        assert!(mirror.host_state().is_some());

        server.await.unwrap();
        settle(|| !session.connected()).await;
        assert!(!session.connected());
        assert_eq!(mirror.this_client_id(), None);
        assert!(matches!(
            session.send(ClientToServer::CreateGameLobby),
            Err(SessionError::NotConnected)
        ));
    }
}
