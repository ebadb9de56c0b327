use gamehost_protocol::{ClientId, ServerToClient};
use std::collections::HashMap;
use tokio::sync::mpsc::UnboundedSender;

/// Maps live connections to client ids. Ids come from a monotonic counter
/// and are never reused while the process is alive, so a stale broadcast
/// can never land on a recycled id.
pub struct ConnectionRegistry {
    next_id: ClientId,
    connections: HashMap<ClientId, UnboundedSender<ServerToClient>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        ConnectionRegistry {
            next_id: 1,
            connections: HashMap::new(),
        }
    }

    pub fn register(&mut self, tx: UnboundedSender<ServerToClient>) -> ClientId {
        let id = self.next_id;
        self.next_id += 1;
        self.connections.insert(id, tx);
        id
    }

    pub fn unregister(&mut self, id: ClientId) {
        self.connections.remove(&id);
    }

    pub fn lookup(&self, id: ClientId) -> Option<&UnboundedSender<ServerToClient>> {
        self.connections.get(&id)
    }

    pub fn connections(
        &self,
    ) -> impl Iterator<Item = (ClientId, &UnboundedSender<ServerToClient>)> {
        self.connections.iter().map(|(id, tx)| (*id, tx))
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }
}
