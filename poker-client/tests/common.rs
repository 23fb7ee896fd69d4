#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use poker_client::{
    ApiError, Connector, ConnectorChannel, PokerApi, SyncService, TransportError, TransportSession,
};
use poker_core::EngineSnapshot;
use poker_persistence::ProfileStore;
use poker_types::{
    CardValue, ClientEvent, Identity, Participant, Role, Room, ServerEvent, Session,
};

/// One simulated backend connection: push events in, client events out.
pub struct FakeLink {
    pub to_client: UnboundedSender<ServerEvent>,
    pub from_client: UnboundedReceiver<ClientEvent>,
}

#[derive(Default)]
pub struct FakeConnector {
    links: Mutex<VecDeque<FakeLink>>,
    pub fail_next: AtomicBool,
    pub opens: AtomicUsize,
}

impl FakeConnector {
    pub async fn take_next_link(&self) -> FakeLink {
        for _ in 0..200 {
            if let Some(link) = self.links.lock().await.pop_front() {
                return link;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("no connection was opened");
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn open(&self, _identity: &Identity) -> Result<ConnectorChannel, TransportError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(TransportError::ConnectFailed("refused".to_string()));
        }
        let (out_tx, out_rx) = unbounded_channel();
        let (in_tx, in_rx) = unbounded_channel();
        self.links.lock().await.push_back(FakeLink {
            to_client: in_tx,
            from_client: out_rx,
        });
        Ok(ConnectorChannel {
            outbound: out_tx,
            inbound: in_rx,
        })
    }
}

/// In-memory stand-in for the backend REST surface.
#[derive(Default)]
pub struct FakeApi {
    pub rooms: StdMutex<Vec<Room>>,
    pub fail_joins: AtomicBool,
    pub reject_votes: AtomicBool,
    /// Join target and the role the request carried.
    pub joins: StdMutex<Vec<(String, Role)>>,
    pub votes: StdMutex<Vec<(String, CardValue)>>,
    pub reveals: StdMutex<Vec<String>>,
    sessions: AtomicUsize,
}

impl FakeApi {
    pub fn with_rooms(rooms: Vec<Room>) -> Self {
        Self {
            rooms: StdMutex::new(rooms),
            ..Self::default()
        }
    }

    fn refuse(&self) -> Result<(), ApiError> {
        if self.fail_joins.load(Ordering::SeqCst) {
            return Err(ApiError::Request {
                status: 404,
                message: "Room not found".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PokerApi for FakeApi {
    async fn list_rooms(&self) -> Result<Vec<Room>, ApiError> {
        Ok(self.rooms.lock().unwrap().clone())
    }

    async fn get_room(&self, room_id: &str) -> Result<Room, ApiError> {
        self.rooms
            .lock()
            .unwrap()
            .iter()
            .find(|room| room.id == room_id)
            .cloned()
            .ok_or(ApiError::Request {
                status: 404,
                message: "Room not found".to_string(),
            })
    }

    async fn create_room(&self, name: &str) -> Result<Room, ApiError> {
        let mut rooms = self.rooms.lock().unwrap();
        let room = Room {
            id: format!("room-{}", rooms.len() + 1),
            name: name.to_string(),
            host_anonymous_id: "anon-ada".to_string(),
            invite_code: format!("INV-{}", rooms.len() + 1),
            is_active: true,
            participants: vec![participant("anon-ada", Role::Participant)],
        };
        rooms.push(room.clone());
        Ok(room)
    }

    async fn join_room(&self, room_id: &str, role: Role) -> Result<Room, ApiError> {
        self.refuse()?;
        self.joins
            .lock()
            .unwrap()
            .push((room_id.to_string(), role));
        self.rooms
            .lock()
            .unwrap()
            .iter()
            .find(|room| room.id == room_id)
            .cloned()
            .ok_or(ApiError::Request {
                status: 404,
                message: "Room not found".to_string(),
            })
    }

    async fn join_by_code(&self, invite_code: &str, role: Role) -> Result<Room, ApiError> {
        self.refuse()?;
        self.joins
            .lock()
            .unwrap()
            .push((invite_code.to_string(), role));
        self.rooms
            .lock()
            .unwrap()
            .iter()
            .find(|room| room.invite_code == invite_code)
            .cloned()
            .ok_or(ApiError::Request {
                status: 404,
                message: "Invalid invite code".to_string(),
            })
    }

    async fn start_session(
        &self,
        room_id: &str,
        topic: &str,
        topic_link: Option<&str>,
    ) -> Result<Session, ApiError> {
        let n = self.sessions.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Session {
            id: format!("s{n}"),
            room_id: room_id.to_string(),
            topic: topic.to_string(),
            topic_link: topic_link.map(str::to_string),
            revealed: false,
        })
    }

    async fn cast_vote(&self, session_id: &str, vote: CardValue) -> Result<(), ApiError> {
        if self.reject_votes.load(Ordering::SeqCst) {
            return Err(ApiError::Request {
                status: 400,
                message: "Voting is closed".to_string(),
            });
        }
        self.votes
            .lock()
            .unwrap()
            .push((session_id.to_string(), vote));
        Ok(())
    }

    async fn reveal_votes(&self, session_id: &str) -> Result<(), ApiError> {
        self.reveals.lock().unwrap().push(session_id.to_string());
        Ok(())
    }
}

pub fn ada() -> Identity {
    Identity::new("Ada", "anon-ada")
}

pub fn participant(id: &str, role: Role) -> Participant {
    Participant {
        anonymous_id: id.to_string(),
        name: id.to_string(),
        role,
    }
}

pub fn planning_room(id: &str) -> Room {
    Room {
        id: id.to_string(),
        name: "Sprint Planning".to_string(),
        host_anonymous_id: "anon-ada".to_string(),
        invite_code: "INV-42".to_string(),
        is_active: true,
        participants: vec![
            participant("anon-ada", Role::Participant),
            participant("anon-bob", Role::Participant),
        ],
    }
}

pub struct Harness {
    pub service: Arc<SyncService>,
    pub connector: Arc<FakeConnector>,
    pub api: Arc<FakeApi>,
    pub store: Arc<ProfileStore>,
    _dir: tempfile::TempDir,
}

pub fn harness_with(api: FakeApi) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(ProfileStore::new(dir.path().join("profile.json")));
    let connector = Arc::new(FakeConnector::default());
    let transport = TransportSession::new(connector.clone(), Duration::from_millis(10));
    let api = Arc::new(api);
    let service = SyncService::new(api.clone(), transport, store.clone(), ada());
    Harness {
        service,
        connector,
        api,
        store,
        _dir: dir,
    }
}

pub fn harness() -> Harness {
    harness_with(FakeApi::with_rooms(vec![planning_room("r1")]))
}

/// Polls the engine until `predicate` holds; panics after ~1s.
pub async fn wait_for<F>(service: &Arc<SyncService>, mut predicate: F) -> EngineSnapshot
where
    F: FnMut(&EngineSnapshot) -> bool,
{
    for _ in 0..200 {
        let snapshot = service.state().await;
        if predicate(&snapshot) {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("engine never reached the expected state");
}
