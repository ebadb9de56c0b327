use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Connection-scoped client identifier. Assigned by the server when the
/// connection is accepted, from a monotonic counter; never reused while
/// the server process is alive.
pub type ClientId = u64;

/// Identifier of a live lobby, unique among live lobbies, never reused.
pub type LobbyId = u64;

/// Identifier of a live game, unique among live games, never reused.
pub type GameId = u64;

/// Longest accepted display name, after trimming.
pub const MAX_NAME_LEN: usize = 32;

/// Maximum players per lobby.
pub const MAX_LOBBY_PLAYERS: usize = 8;

/// Fewest players a lobby needs before its game can start.
pub const MIN_PLAYERS_TO_START: usize = 2;

/// ---- Host state snapshot ----

/// A named, connected client as visible to every peer. Clients that have
/// not yet set a name are connected but not listed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedClient {
    pub id: ClientId,
    pub name: String,
}

/// A client as it appears inside a lobby or game roster. Back-reference to
/// a connected client; rosters never outlive the connection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: ClientId,
    pub name: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum LobbyStatus {
    Open,
    Starting,
}

/// A pre-game grouping of players. `players` is in join order; the first
/// slot after an owner departure inherits ownership.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GameLobby {
    pub lobby_id: LobbyId,
    pub owner_id: ClientId,
    pub players: Vec<Player>,
    pub status: LobbyStatus,
}

/// A started game session. `state` is a game-specific payload the host
/// carries but never interprets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActiveGame {
    pub game_id: GameId,
    pub players: Vec<Player>,
    pub state: serde_json::Value,
}

/// The full authoritative snapshot broadcast to clients. Always a value
/// consistent with some completed sequence of applied commands.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HostState {
    pub connected_clients: Vec<ConnectedClient>,
    pub lobbies: Vec<GameLobby>,
    pub active_games: Vec<ActiveGame>,
}

impl HostState {
    pub fn lobby(&self, lobby_id: LobbyId) -> Option<&GameLobby> {
        self.lobbies.iter().find(|l| l.lobby_id == lobby_id)
    }

    /// The open lobby this client is a player in, if any.
    pub fn lobby_of(&self, id: ClientId) -> Option<&GameLobby> {
        self.lobbies
            .iter()
            .find(|l| l.players.iter().any(|p| p.id == id))
    }

    /// The active game this client is a player in, if any.
    pub fn game_of(&self, id: ClientId) -> Option<&ActiveGame> {
        self.active_games
            .iter()
            .find(|g| g.players.iter().any(|p| p.id == id))
    }
}

/// ---- Commands ----

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum ClientToServer {
    SetName { name: String },
    CreateGameLobby,
    JoinLobby { lobby_id: LobbyId },
    LeaveLobby { lobby_id: LobbyId },
    CloseLobby { lobby_id: LobbyId },
    StartGame { lobby_id: LobbyId },
    EndGame { game_id: GameId },
}

impl ClientToServer {
    /// Wire name of the command, echoed back in `commandError`.
    pub fn name(&self) -> &'static str {
        match self {
            ClientToServer::SetName { .. } => "setName",
            ClientToServer::CreateGameLobby => "createGameLobby",
            ClientToServer::JoinLobby { .. } => "joinLobby",
            ClientToServer::LeaveLobby { .. } => "leaveLobby",
            ClientToServer::CloseLobby { .. } => "closeLobby",
            ClientToServer::StartGame { .. } => "startGame",
            ClientToServer::EndGame { .. } => "endGame",
        }
    }
}

/// ---- Server events ----

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum ServerToClient {
    /// Sent once when the connection is accepted.
    Welcome { your_id: ClientId },
    /// Full snapshot, sent on accept and after every applied mutation.
    StateUpdate { snapshot: HostState },
    /// Sent only to the client whose command was rejected.
    CommandError { command: String, reason: ErrorReason },
}

/// ---- Failure taxonomy ----

/// Broad category of a rejection, for callers that branch on class rather
/// than on the specific reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    StateConflict,
    NotFound,
    Transport,
}

/// Why a command was rejected. Serialized into `commandError`; the host
/// state is untouched whenever one of these is produced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Error)]
#[serde(rename_all = "camelCase")]
pub enum ErrorReason {
    #[error("command payload was malformed")]
    Malformed,
    #[error("name must be non-empty and at most {MAX_NAME_LEN} characters")]
    InvalidName,
    #[error("set a name first")]
    NotNamed,
    #[error("already in a lobby")]
    AlreadyInLobby,
    #[error("lobby not found")]
    LobbyNotFound,
    #[error("lobby is full")]
    LobbyFull,
    #[error("not a player in that lobby")]
    NotInLobby,
    #[error("only the lobby owner may do that")]
    NotOwner,
    #[error("not enough players to start")]
    NotEnoughPlayers,
    #[error("game not found")]
    GameNotFound,
    #[error("not a player in that game")]
    NotInGame,
    #[error("command does not fit the current state")]
    InvalidState,
    #[error("not connected")]
    NotConnected,
}

impl ErrorReason {
    pub fn kind(&self) -> ErrorKind {
        use ErrorReason::*;
        match self {
            Malformed | InvalidName => ErrorKind::Validation,
            NotNamed | AlreadyInLobby | LobbyFull | NotInLobby | NotOwner
            | NotEnoughPlayers | NotInGame | InvalidState => ErrorKind::StateConflict,
            LobbyNotFound | GameNotFound => ErrorKind::NotFound,
            NotConnected => ErrorKind::Transport,
        }
    }
}
