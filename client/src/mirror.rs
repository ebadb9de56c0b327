//! Locally held copy of the last authoritative snapshot plus purely local
//! state. Snapshots replace the mirrored state wholesale; there is no
//! client-side merge.

use gamehost_protocol::{ClientId, HostState};
use parking_lot::Mutex;
use tracing::warn;

use crate::local::LocalStore;

#[derive(Default)]
struct MirrorState {
    this_client_id: Option<ClientId>,
    local_name: Option<String>,
    host_state: Option<HostState>,
    game_state: Option<serde_json::Value>,
}

/// The client's view of the world. Mutated only by the session's reader
/// pump (crate-internal) and by `set_local_name`; everything else reads.
pub struct ClientStateMirror {
    inner: Mutex<MirrorState>,
    local: Option<LocalStore>,
}

impl ClientStateMirror {
    /// Mirror backed by local persistence; the stored display name, if
    /// any, pre-populates `local_name`.
    pub fn new(local: LocalStore) -> Self {
        let local_name = local.load_name();
        ClientStateMirror {
            inner: Mutex::new(MirrorState {
                local_name,
                ..MirrorState::default()
            }),
            local: Some(local),
        }
    }

    /// Mirror with no persistence behind it.
    pub fn detached() -> Self {
        ClientStateMirror {
            inner: Mutex::new(MirrorState::default()),
            local: None,
        }
    }

    pub fn this_client_id(&self) -> Option<ClientId> {
        self.inner.lock().this_client_id
    }

    pub fn local_name(&self) -> Option<String> {
        self.inner.lock().local_name.clone()
    }

    pub fn host_state(&self) -> Option<HostState> {
        self.inner.lock().host_state.clone()
    }

    pub fn game_state(&self) -> Option<serde_json::Value> {
        self.inner.lock().game_state.clone()
    }

    /// Local-only action: remember the chosen display name. Does not talk
    /// to the server; callers follow up with a `setName` command.
    pub fn set_local_name(&self, name: &str) {
        self.inner.lock().local_name = Some(name.to_string());
        if let Some(local) = &self.local {
            if let Err(error) = local.store_name(name) {
                warn!(%error, "failed to persist display name");
            }
        }
    }

    pub(crate) fn set_client_id(&self, id: ClientId) {
        self.inner.lock().this_client_id = Some(id);
    }

    /// Replace the mirrored snapshot wholesale and re-derive the opaque
    /// payload of whichever game this client is in.
    pub(crate) fn apply_snapshot(&self, snapshot: HostState) {
        let mut inner = self.inner.lock();
        inner.game_state = inner
            .this_client_id
            .and_then(|id| snapshot.game_of(id))
            .map(|g| g.state.clone());
        inner.host_state = Some(snapshot);
    }

    /// Identities are connection-scoped; losing the link invalidates ours.
    /// The last snapshot is kept for display until a new session replaces it.
    pub(crate) fn connection_lost(&self) {
        self.inner.lock().this_client_id = None;
    }
}
