use gamehost_protocol::{
    ActiveGame, ClientId, ConnectedClient, ErrorReason, GameId, GameLobby, HostState, LobbyId,
    LobbyStatus, Player, MAX_LOBBY_PLAYERS, MAX_NAME_LEN, MIN_PLAYERS_TO_START,
};
use std::collections::BTreeMap;

/// Server-internal identity of one connection. The peer-visible
/// `ConnectedClient` is the named subset of these.
#[derive(Debug, Clone)]
struct ClientIdentity {
    id: ClientId,
    name: Option<String>,
}

/// Internal lobby record. Rosters hold only ids; `Player` values are
/// projected at snapshot time so a rename shows up everywhere at once.
#[derive(Debug, Clone)]
struct LobbyRecord {
    lobby_id: LobbyId,
    owner_id: ClientId,
    players: Vec<ClientId>,
    status: LobbyStatus,
}

#[derive(Debug, Clone)]
struct GameRecord {
    game_id: GameId,
    players: Vec<ClientId>,
    state: serde_json::Value,
}

/// Sole owner of the authoritative host state. Every mutation goes through
/// one of the command operations below; each either applies fully and
/// returns `Ok`, or leaves the state untouched and returns the reason.
pub struct HostStateStore {
    clients: BTreeMap<ClientId, ClientIdentity>,
    lobbies: Vec<LobbyRecord>,
    games: Vec<GameRecord>,
    next_lobby_id: LobbyId,
    next_game_id: GameId,
}

impl HostStateStore {
    pub fn new() -> Self {
        HostStateStore {
            clients: BTreeMap::new(),
            lobbies: Vec::new(),
            games: Vec::new(),
            next_lobby_id: 1,
            next_game_id: 1,
        }
    }

    /// Record a freshly accepted connection. The client stays invisible to
    /// peers until it sets a name.
    pub fn connect(&mut self, id: ClientId) {
        self.clients.insert(id, ClientIdentity { id, name: None });
    }

    pub fn set_name(&mut self, id: ClientId, name: &str) -> Result<(), ErrorReason> {
        let trimmed = name.trim();
        if trimmed.is_empty() || trimmed.len() > MAX_NAME_LEN {
            return Err(ErrorReason::InvalidName);
        }
        let client = self.clients.get_mut(&id).ok_or(ErrorReason::InvalidState)?;
        client.name = Some(trimmed.to_string());
        Ok(())
    }

    pub fn create_lobby(&mut self, owner: ClientId) -> Result<LobbyId, ErrorReason> {
        if !self.is_named(owner) {
            return Err(ErrorReason::NotNamed);
        }
        if self.lobby_of(owner).is_some() {
            return Err(ErrorReason::AlreadyInLobby);
        }
        if self.game_of(owner).is_some() {
            return Err(ErrorReason::InvalidState);
        }
        let lobby_id = self.next_lobby_id;
        self.next_lobby_id += 1;
        self.lobbies.push(LobbyRecord {
            lobby_id,
            owner_id: owner,
            players: vec![owner],
            status: LobbyStatus::Open,
        });
        Ok(lobby_id)
    }

    pub fn join_lobby(&mut self, id: ClientId, lobby_id: LobbyId) -> Result<(), ErrorReason> {
        let idx = self.lobby_index(lobby_id).ok_or(ErrorReason::LobbyNotFound)?;
        if !self.is_named(id) {
            return Err(ErrorReason::NotNamed);
        }
        if self.game_of(id).is_some() {
            return Err(ErrorReason::InvalidState);
        }
        if self.lobby_of(id).is_some() {
            return Err(ErrorReason::AlreadyInLobby);
        }
        let lobby = &mut self.lobbies[idx];
        if lobby.status != LobbyStatus::Open {
            return Err(ErrorReason::InvalidState);
        }
        if lobby.players.len() >= MAX_LOBBY_PLAYERS {
            return Err(ErrorReason::LobbyFull);
        }
        lobby.players.push(id);
        Ok(())
    }

    pub fn leave_lobby(&mut self, id: ClientId, lobby_id: LobbyId) -> Result<(), ErrorReason> {
        let idx = self.lobby_index(lobby_id).ok_or(ErrorReason::LobbyNotFound)?;
        if !self.lobbies[idx].players.contains(&id) {
            return Err(ErrorReason::NotInLobby);
        }
        self.remove_from_lobby(idx, id);
        Ok(())
    }

    pub fn close_lobby(&mut self, id: ClientId, lobby_id: LobbyId) -> Result<(), ErrorReason> {
        let idx = self.lobby_index(lobby_id).ok_or(ErrorReason::LobbyNotFound)?;
        if self.lobbies[idx].owner_id != id {
            return Err(ErrorReason::NotOwner);
        }
        self.lobbies.remove(idx);
        Ok(())
    }

    /// Convert a lobby into an active game. The lobby is marked `Starting`
    /// for the duration of the conversion and destroyed before the next
    /// snapshot, so clients only ever observe `Open` lobbies.
    pub fn start_game(&mut self, id: ClientId, lobby_id: LobbyId) -> Result<GameId, ErrorReason> {
        let idx = self.lobby_index(lobby_id).ok_or(ErrorReason::LobbyNotFound)?;
        if !self.lobbies[idx].players.contains(&id) {
            return Err(ErrorReason::NotInLobby);
        }
        if self.lobbies[idx].players.len() < MIN_PLAYERS_TO_START {
            return Err(ErrorReason::NotEnoughPlayers);
        }
        self.lobbies[idx].status = LobbyStatus::Starting;
        let lobby = self.lobbies.remove(idx);
        let game_id = self.next_game_id;
        self.next_game_id += 1;
        self.games.push(GameRecord {
            game_id,
            players: lobby.players,
            state: serde_json::Value::Null,
        });
        Ok(game_id)
    }

    pub fn end_game(&mut self, id: ClientId, game_id: GameId) -> Result<(), ErrorReason> {
        let idx = self
            .games
            .iter()
            .position(|g| g.game_id == game_id)
            .ok_or(ErrorReason::GameNotFound)?;
        if !self.games[idx].players.contains(&id) {
            return Err(ErrorReason::NotInGame);
        }
        self.games.remove(idx);
        Ok(())
    }

    /// Evict a client and cascade: lobby departure follows the leave rules
    /// (ownership transfer, empty-lobby teardown), games drop the player and
    /// are destroyed once empty. Calling this for an unknown id is a no-op.
    pub fn disconnect(&mut self, id: ClientId) {
        if self.clients.remove(&id).is_none() {
            return;
        }
        if let Some(idx) = self.lobbies.iter().position(|l| l.players.contains(&id)) {
            self.remove_from_lobby(idx, id);
        }
        for game in self.games.iter_mut() {
            game.players.retain(|p| *p != id);
        }
        self.games.retain(|g| !g.players.is_empty());
    }

    /// Project the public snapshot. Clients ascend by id (which is connect
    /// order), lobbies and games keep creation order.
    pub fn snapshot(&self) -> HostState {
        HostState {
            connected_clients: self
                .clients
                .values()
                .filter_map(|c| {
                    c.name
                        .clone()
                        .map(|name| ConnectedClient { id: c.id, name })
                })
                .collect(),
            lobbies: self
                .lobbies
                .iter()
                .map(|l| GameLobby {
                    lobby_id: l.lobby_id,
                    owner_id: l.owner_id,
                    players: l.players.iter().map(|&id| self.player(id)).collect(),
                    status: l.status,
                })
                .collect(),
            active_games: self
                .games
                .iter()
                .map(|g| ActiveGame {
                    game_id: g.game_id,
                    players: g.players.iter().map(|&id| self.player(id)).collect(),
                    state: g.state.clone(),
                })
                .collect(),
        }
    }

    /* ---------------- internal helpers ---------------- */

    fn is_named(&self, id: ClientId) -> bool {
        self.clients.get(&id).map_or(false, |c| c.name.is_some())
    }

    fn lobby_index(&self, lobby_id: LobbyId) -> Option<usize> {
        self.lobbies.iter().position(|l| l.lobby_id == lobby_id)
    }

    fn lobby_of(&self, id: ClientId) -> Option<&LobbyRecord> {
        self.lobbies.iter().find(|l| l.players.contains(&id))
    }

    fn game_of(&self, id: ClientId) -> Option<&GameRecord> {
        self.games.iter().find(|g| g.players.contains(&id))
    }

    /// Drop a member from a lobby, promoting the next player in join order
    /// when the owner leaves and tearing the lobby down once empty.
    fn remove_from_lobby(&mut self, idx: usize, id: ClientId) {
        self.lobbies[idx].players.retain(|p| *p != id);
        if self.lobbies[idx].players.is_empty() {
            self.lobbies.remove(idx);
            return;
        }
        if self.lobbies[idx].owner_id == id {
            self.lobbies[idx].owner_id = self.lobbies[idx].players[0];
        }
    }

    fn player(&self, id: ClientId) -> Player {
        Player {
            id,
            name: self
                .clients
                .get(&id)
                .and_then(|c| c.name.clone())
                .unwrap_or_default(),
        }
    }
}
