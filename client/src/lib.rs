//! Client side of the game host: a websocket transport session plus a
//! locally held mirror of the last authoritative snapshot. The server is
//! the sole source of truth; the mirror never merges, it replaces.

pub mod local;
pub mod mirror;
pub mod session;

pub use local::LocalStore;
pub use mirror::ClientStateMirror;
pub use session::{Session, SessionError};
