use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

use poker_client::{
    Config, HttpApi, RestoreOutcome, SessionRestore, SyncService, TransportSession, WsConnector,
};
use poker_core::{EngineEvent, EngineEventHandler, VoteSlot, VotingPhase};
use poker_persistence::{IdentityStore, ProfileStore};
use poker_types::{CARD_DECK, CardValue, Role};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();
    let config = Config::new();

    let store = Arc::new(ProfileStore::new(&config.profile_path));
    let identity_store = IdentityStore::new(store.clone());
    let restore = SessionRestore::new(store.clone());

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    let identity = match restore.identity() {
        Some(identity) => identity,
        None => {
            println!("Enter your display name:");
            let name = match lines.next_line().await {
                Ok(Some(line)) if !line.trim().is_empty() => line.trim().to_string(),
                _ => {
                    eprintln!("a display name is required");
                    return;
                }
            };
            match identity_store.get_or_create(&name) {
                Ok(identity) => identity,
                Err(e) => {
                    error!(error = %e, "could not persist identity");
                    return;
                }
            }
        }
    };
    info!(name = %identity.name, anonymous_id = %identity.anonymous_id, "starting");

    let api = match HttpApi::new(
        config.api_base_url.clone(),
        identity.clone(),
        Duration::from_secs(config.request_timeout_seconds),
    ) {
        Ok(api) => Arc::new(api),
        Err(e) => {
            error!(error = %e, "could not build the api client");
            return;
        }
    };
    let connector = Arc::new(WsConnector::new(config.ws_url.clone()));
    let transport = TransportSession::new(
        connector,
        Duration::from_secs(config.reconnect_delay_seconds),
    );
    let service = SyncService::new(api, transport, store.clone(), identity);
    service.add_handler(Box::new(EventLogger)).await;

    match restore.resume(&service).await {
        Ok(RestoreOutcome::Rejoined(room_id)) => info!(%room_id, "rejoined previous room"),
        Ok(RestoreOutcome::RoomList) => {
            println!("No previous room. Try `rooms`, `create <name>` or `join <code>`.")
        }
        Ok(RestoreOutcome::NeedsIdentity) => {
            // identity was created above, resume again picks it up
            if let Err(e) = restore.resume(&service).await {
                warn!(error = %e, "restore failed");
            }
        }
        Err(e) => warn!(error = %e, "restore failed"),
    }

    print_help();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => {
                let Ok(Some(line)) = line else { break };
                if !run_command(&service, line.trim()).await {
                    break;
                }
            }
        }
    }

    service.shutdown().await;
    info!("goodbye");
}

/// Logs every applied engine change; a richer frontend would redraw
/// here instead.
struct EventLogger;

impl EngineEventHandler for EventLogger {
    fn handle_event(&mut self, event: EngineEvent) {
        info!(?event, "state changed");
    }
}

fn print_help() {
    let deck: Vec<String> = CARD_DECK.iter().map(CardValue::to_string).collect();
    println!("Commands:");
    println!("  rooms                 list open rooms");
    println!("  create <name>         create a room and become its host");
    println!("  join <invite-code> [observer]    join a room by invite code");
    println!("  joinid <room-id> [observer]      join a room by id");
    println!("  refresh               refetch the room from the backend");
    println!("  session <topic>       start a voting session (host)");
    println!("  vote <card>           cast a vote ({})", deck.join(" "));
    println!("  reveal                reveal votes (host)");
    println!("  reset                 clear votes, same topic (host)");
    println!("  state                 show the current room state");
    println!("  leave                 leave the room");
    println!("  logout                forget identity and exit");
    println!("  quit                  exit");
}

async fn run_command(service: &Arc<SyncService>, line: &str) -> bool {
    let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
    let rest = rest.trim();
    match command {
        "" => {}
        "help" => print_help(),
        "rooms" => match service.list_rooms().await {
            Ok(rooms) => {
                for room in rooms {
                    println!(
                        "  {} — {} ({} participants, code {})",
                        room.id,
                        room.name,
                        room.participants.len(),
                        room.invite_code
                    );
                }
            }
            Err(e) => println!("could not list rooms: {e}"),
        },
        "create" => match service.create_room(rest).await {
            Ok(room) => println!("created {} (invite code {})", room.name, room.invite_code),
            Err(e) => println!("could not create room: {e}"),
        },
        "join" => {
            let (code, role) = target_and_role(rest);
            match service.join_by_code_as(code, role).await {
                Ok(room) => println!("joined {}", room.name),
                Err(e) => println!("could not join: {e}"),
            }
        }
        "joinid" => {
            let (room_id, role) = target_and_role(rest);
            match service.join_room_as(room_id, role).await {
                Ok(room) => println!("joined {}", room.name),
                Err(e) => println!("could not join: {e}"),
            }
        }
        "refresh" => match service.refresh_room().await {
            Ok(room) => println!("refreshed {}", room.name),
            Err(e) => println!("could not refresh: {e}"),
        },
        "session" => match service.start_session(rest, None).await {
            Ok(session) => println!("voting on: {}", session.topic),
            Err(e) => println!("could not start session: {e}"),
        },
        "vote" => match CardValue::parse(rest) {
            Some(card) => match service.cast_vote(card).await {
                Ok(()) => println!("voted"),
                Err(e) => println!("vote failed: {e}"),
            },
            None => println!("not a card in the deck: {rest}"),
        },
        "reveal" => match service.reveal_votes().await {
            Ok(()) => {}
            Err(e) => println!("could not reveal: {e}"),
        },
        "reset" => match service.reset_votes().await {
            Ok(()) => println!("votes cleared"),
            Err(e) => println!("could not reset: {e}"),
        },
        "state" => print_state(service).await,
        "leave" => match service.leave_room().await {
            Ok(()) => println!("left the room"),
            Err(e) => println!("could not leave: {e}"),
        },
        "logout" => {
            if let Err(e) = service.logout().await {
                println!("logout failed: {e}");
            }
            return false;
        }
        "quit" | "exit" => return false,
        other => println!("unknown command: {other} (try `help`)"),
    }
    true
}

fn target_and_role(rest: &str) -> (&str, Role) {
    if let Some((target, extra)) = rest.split_once(' ') {
        if extra.trim() == "observer" {
            return (target, Role::Observer);
        }
    }
    (rest, Role::Participant)
}

async fn print_state(service: &Arc<SyncService>) {
    let snapshot = service.state().await;
    let Some(room) = &snapshot.room else {
        println!("not in a room");
        return;
    };
    println!(
        "{} ({}) — {}",
        room.name,
        room.invite_code,
        if snapshot.connected {
            "live"
        } else {
            "reconnecting"
        }
    );
    for participant in &room.participants {
        let marker = match snapshot.votes.get(&participant.anonymous_id) {
            Some(VoteSlot::Cast(card)) => card.to_string(),
            Some(VoteSlot::Hidden) => "voted".to_string(),
            None if participant.is_voter() => "waiting".to_string(),
            None => "observing".to_string(),
        };
        let host = if room.is_hosted_by(&participant.anonymous_id) {
            " (host)"
        } else {
            ""
        };
        println!("  {}{} — {}", participant.name, host, marker);
    }
    match snapshot.phase {
        VotingPhase::NoSession => println!("no active session"),
        VotingPhase::Collecting => {
            let topic = snapshot.session.as_ref().map(|s| s.topic.as_str()).unwrap_or("");
            if snapshot.all_votes_in {
                println!("voting on: {topic} — everyone has voted");
            } else {
                println!("voting on: {topic}");
            }
        }
        VotingPhase::Revealed => {
            if let Some(tally) = service.tally().await {
                for (card, count) in &tally.distribution {
                    println!("  {card}: {count}");
                }
                match tally.average {
                    Some(average) => println!("average: {average:.1}"),
                    None => println!("average: n/a"),
                }
                if tally.consensus {
                    println!("consensus!");
                }
            }
        }
    }
}
