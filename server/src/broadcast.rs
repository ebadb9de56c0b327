use crate::Host;
use gamehost_protocol::ServerToClient;
use tracing::debug;

/// Push the current snapshot to every live connection. Sends are
/// fire-and-forget onto each connection's own outbound queue; a closed
/// receiver is skipped and its read loop performs the actual cleanup.
pub fn state(host: &Host) {
    let snapshot = host.store.snapshot();
    debug!(
        connections = host.registry.len(),
        clients = snapshot.connected_clients.len(),
        lobbies = snapshot.lobbies.len(),
        games = snapshot.active_games.len(),
        "broadcast"
    );
    for (id, tx) in host.registry.connections() {
        let update = ServerToClient::StateUpdate {
            snapshot: snapshot.clone(),
        };
        if tx.send(update).is_err() {
            debug!(client = id, "dropped broadcast to closed connection");
        }
    }
}
