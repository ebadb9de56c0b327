use clap::Parser;
use gamehost_client::{ClientStateMirror, LocalStore, Session};
use gamehost_protocol::{ClientId, ClientToServer, GameId, HostState, LobbyId};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "gamehost-cli")]
#[command(about = "Interactive terminal client for the game host")]
struct Args {
    /// Websocket url of the game host
    #[arg(long, default_value = "ws://127.0.0.1:9001/ws")]
    url: String,
    /// Directory for locally persisted settings
    #[arg(long, default_value = ".gamehost")]
    data_dir: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    println!("🎮 Game Host CLI");
    println!("================");

    let local = LocalStore::new(&args.data_dir)?;
    let mirror = Arc::new(ClientStateMirror::new(local));

    println!("🔗 Connecting to {}...", args.url);
    let session = Session::connect(&args.url, mirror.clone()).await?;
    println!("✅ Connected!");

    let mirror_cb = mirror.clone();
    session.on_state_update(move |snapshot| {
        print_host_state(snapshot, mirror_cb.this_client_id());
    });
    session.on_command_error(|command, reason| {
        println!("❌ {command}: {reason}");
    });

    match mirror.local_name() {
        Some(name) => {
            println!("👋 Hello again, {name}");
            session.send(ClientToServer::SetName { name })?;
        }
        None => {
            println!("ℹ️  You have no name yet — introduce yourself with: name <yourname>");
        }
    }

    print_help();

    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" {
            break;
        }
        if line == "help" {
            print_help();
            continue;
        }
        if line == "state" {
            match mirror.host_state() {
                Some(snapshot) => print_host_state(&snapshot, mirror.this_client_id()),
                None => println!("ℹ️  Nothing received from the host yet"),
            }
            continue;
        }
        if line == "game" {
            match mirror.game_state() {
                Some(state) => println!("🎲 {}", serde_json::to_string_pretty(&state)?),
                None => println!("ℹ️  You are not in a game"),
            }
            continue;
        }

        if let Some(cmd) = parse_command(line, &mirror) {
            if let ClientToServer::SetName { name } = &cmd {
                // remember the choice locally before the host confirms it
                mirror.set_local_name(name);
            }
            if let Err(error) = session.send(cmd) {
                println!("❌ {error}");
            }
        } else {
            println!("❓ Unknown command: {line}");
        }
    }

    println!("👋 Goodbye!");
    Ok(())
}

fn print_help() {
    println!("\n📋 Commands:");
    println!("  name <yourname> - Choose or change your display name");
    println!("  create          - Open a new lobby");
    println!("  join <lobbyId>  - Join an open lobby");
    println!("  leave           - Leave your lobby");
    println!("  close           - Close your lobby (owner only)");
    println!("  start           - Start your lobby's game");
    println!("  end             - End your game");
    println!("  state           - Show the last snapshot");
    println!("  game            - Show your game's payload");
    println!("  quit            - Exit");
    println!();
}

fn parse_command(input: &str, mirror: &ClientStateMirror) -> Option<ClientToServer> {
    let parts: Vec<&str> = input.split_whitespace().collect();
    match *parts.first()? {
        "name" if parts.len() > 1 => Some(ClientToServer::SetName {
            name: parts[1..].join(" "),
        }),
        "create" => Some(ClientToServer::CreateGameLobby),
        "join" => parts
            .get(1)?
            .parse()
            .ok()
            .map(|lobby_id| ClientToServer::JoinLobby { lobby_id }),
        "leave" => my_lobby(mirror).map(|lobby_id| ClientToServer::LeaveLobby { lobby_id }),
        "close" => my_lobby(mirror).map(|lobby_id| ClientToServer::CloseLobby { lobby_id }),
        "start" => my_lobby(mirror).map(|lobby_id| ClientToServer::StartGame { lobby_id }),
        "end" => my_game(mirror).map(|game_id| ClientToServer::EndGame { game_id }),
        _ => None,
    }
}

fn my_lobby(mirror: &ClientStateMirror) -> Option<LobbyId> {
    let id = mirror.this_client_id()?;
    let snapshot = mirror.host_state()?;
    snapshot.lobby_of(id).map(|l| l.lobby_id)
}

fn my_game(mirror: &ClientStateMirror) -> Option<GameId> {
    let id = mirror.this_client_id()?;
    let snapshot = mirror.host_state()?;
    snapshot.game_of(id).map(|g| g.game_id)
}

fn print_host_state(snapshot: &HostState, my_id: Option<ClientId>) {
    println!("\n🗺️  === HOST STATE ===");
    println!("👥 Clients ({}):", snapshot.connected_clients.len());
    for client in &snapshot.connected_clients {
        let you = if Some(client.id) == my_id { " 👈 you" } else { "" };
        println!("  {}: {}{}", client.id, client.name, you);
    }
    println!("🏠 Lobbies ({}):", snapshot.lobbies.len());
    for lobby in &snapshot.lobbies {
        let names: Vec<&str> = lobby.players.iter().map(|p| p.name.as_str()).collect();
        println!(
            "  #{}: owner={} players=[{}]",
            lobby.lobby_id,
            lobby.owner_id,
            names.join(", ")
        );
    }
    println!("🎲 Games ({}):", snapshot.active_games.len());
    for game in &snapshot.active_games {
        let names: Vec<&str> = game.players.iter().map(|p| p.name.as_str()).collect();
        println!("  #{}: players=[{}]", game.game_id, names.join(", "));
    }
    println!("====================\n");
}
