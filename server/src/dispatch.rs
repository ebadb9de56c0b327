use crate::{broadcast, AppState};
use gamehost_protocol::{ClientId, ClientToServer, ErrorReason, ServerToClient};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

/// Accept a connection: register it, record the identity, and deliver the
/// `welcome` plus the initial full snapshot before any broadcast can reach
/// this connection's queue.
pub fn connect(state: &AppState, tx: &UnboundedSender<ServerToClient>) -> ClientId {
    let mut host = state.lock();
    let id = host.registry.register(tx.clone());
    host.store.connect(id);
    let _ = tx.send(ServerToClient::Welcome { your_id: id });
    let _ = tx.send(ServerToClient::StateUpdate {
        snapshot: host.store.snapshot(),
    });
    info!(client = id, "connected");
    id
}

/// Tear a connection down. Safe to call more than once for the same id;
/// the second call finds nothing to evict.
pub fn disconnect(state: &AppState, id: ClientId) {
    let mut host = state.lock();
    host.registry.unregister(id);
    host.store.disconnect(id);
    broadcast::state(&host);
    info!(client = id, "disconnected");
}

/// Apply one command against the store. Commands are serialized by the
/// state lock, so overlapping mutations resolve in arrival order; on
/// success the new snapshot fans out to everyone, on failure only the
/// issuer hears about it and the state is untouched.
pub fn handle(state: &AppState, id: ClientId, cmd: ClientToServer) {
    let command = cmd.name();
    let mut host = state.lock();
    let result = match cmd {
        ClientToServer::SetName { name } => host.store.set_name(id, &name),
        ClientToServer::CreateGameLobby => host.store.create_lobby(id).map(|_| ()),
        ClientToServer::JoinLobby { lobby_id } => host.store.join_lobby(id, lobby_id),
        ClientToServer::LeaveLobby { lobby_id } => host.store.leave_lobby(id, lobby_id),
        ClientToServer::CloseLobby { lobby_id } => host.store.close_lobby(id, lobby_id),
        ClientToServer::StartGame { lobby_id } => host.store.start_game(id, lobby_id).map(|_| ()),
        ClientToServer::EndGame { game_id } => host.store.end_game(id, game_id),
    };
    match result {
        Ok(()) => broadcast::state(&host),
        Err(reason) => {
            warn!(client = id, command, %reason, kind = ?reason.kind(), "command rejected");
            send_error(&host, id, command, reason);
        }
    }
}

/// Reject something that never reached the store, e.g. an unparsable frame.
pub fn reject(state: &AppState, id: ClientId, command: &str, reason: ErrorReason) {
    let host = state.lock();
    send_error(&host, id, command, reason);
}

fn send_error(host: &crate::Host, id: ClientId, command: &str, reason: ErrorReason) {
    if let Some(tx) = host.registry.lookup(id) {
        let _ = tx.send(ServerToClient::CommandError {
            command: command.to_string(),
            reason,
        });
    }
}
