use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use poker_core::{EngineEventHandler, EngineSnapshot, RoomEngine, VoteTally};
use poker_persistence::ProfileStore;
use poker_types::{CardValue, ClientEvent, Identity, Role, Room, ServerEvent, Session, ids_match};

use crate::api::{ApiError, PokerApi};
use crate::transport::{TransportError, TransportEvent, TransportSession};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("not connected to the push channel")]
    Offline,
    #[error("not in a room")]
    NoRoom,
    #[error("no active voting session")]
    NoSession,
    #[error("superseded by a newer room change")]
    Superseded,
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Persistence(#[from] anyhow::Error),
}

/// Coordinates the REST surface, the push channel and the
/// reconciliation engine into one client-facing service.
///
/// Every authoritative mutation goes REST-first; the engine is updated
/// from the response or from the push echo, whichever arrives. The
/// service never lets a slow REST response clobber the engine after
/// the user has already moved to another room (join epochs).
pub struct SyncService {
    engine: Arc<RwLock<RoomEngine>>,
    transport: Arc<TransportSession>,
    api: Arc<dyn PokerApi>,
    store: Arc<ProfileStore>,
    /// Bumped by every join/leave; a REST join response from an older
    /// epoch is discarded instead of applied.
    join_epoch: AtomicU64,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl SyncService {
    pub fn new(
        api: Arc<dyn PokerApi>,
        transport: Arc<TransportSession>,
        store: Arc<ProfileStore>,
        identity: Identity,
    ) -> Arc<Self> {
        Arc::new(Self {
            engine: Arc::new(RwLock::new(RoomEngine::new(identity))),
            transport,
            api,
            store,
            join_epoch: AtomicU64::new(0),
            pump: Mutex::new(None),
        })
    }

    /// Spawns the event pump and opens the push channel. A connect
    /// failure is returned, but the transport keeps retrying in the
    /// background; the pump reflects eventual connectivity into the
    /// engine either way.
    pub async fn start(self: &Arc<Self>) -> Result<(), TransportError> {
        let (_id, rx) = self.transport.subscribe().await;
        let handle = tokio::spawn(run_pump(
            Arc::clone(&self.engine),
            Arc::clone(&self.transport),
            rx,
        ));
        if let Some(old) = self.pump.lock().await.replace(handle) {
            old.abort();
        }
        let identity = self.engine.read().await.identity().clone();
        self.transport.connect(identity).await
    }

    pub async fn shutdown(&self) {
        if let Some(pump) = self.pump.lock().await.take() {
            pump.abort();
        }
        self.transport.disconnect().await;
    }

    pub async fn state(&self) -> EngineSnapshot {
        self.engine.read().await.snapshot()
    }

    pub async fn tally(&self) -> Option<VoteTally> {
        self.engine.read().await.tally()
    }

    pub async fn identity(&self) -> Identity {
        self.engine.read().await.identity().clone()
    }

    pub async fn add_handler(&self, handler: Box<dyn EngineEventHandler>) {
        self.engine.write().await.add_handler(handler);
    }

    pub async fn list_rooms(&self) -> Result<Vec<Room>, SyncError> {
        Ok(self.api.list_rooms().await?)
    }

    pub async fn create_room(&self, name: &str) -> Result<Room, SyncError> {
        let epoch = self.begin_join();
        let room = self.api.create_room(name).await?;
        self.finish_join(epoch, room).await
    }

    pub async fn join_room(&self, room_id: &str) -> Result<Room, SyncError> {
        self.join_room_as(room_id, Role::Participant).await
    }

    pub async fn join_room_as(&self, room_id: &str, role: Role) -> Result<Room, SyncError> {
        let epoch = self.begin_join();
        let room = self.api.join_room(room_id, role).await?;
        self.finish_join(epoch, room).await
    }

    pub async fn join_by_code(&self, invite_code: &str) -> Result<Room, SyncError> {
        self.join_by_code_as(invite_code, Role::Participant).await
    }

    pub async fn join_by_code_as(&self, invite_code: &str, role: Role) -> Result<Room, SyncError> {
        let epoch = self.begin_join();
        let room = self.api.join_by_code(invite_code, role).await?;
        self.finish_join(epoch, room).await
    }

    /// On-demand authoritative refetch of the tracked room. The engine
    /// still ignores it if a push for the room already landed.
    pub async fn refresh_room(&self) -> Result<Room, SyncError> {
        let room_id = {
            let engine = self.engine.read().await;
            engine
                .room()
                .map(|room| room.id.clone())
                .ok_or(SyncError::NoRoom)?
        };
        let room = self.api.get_room(&room_id).await?;
        let mut engine = self.engine.write().await;
        // the user may have left or switched rooms while the request
        // was in flight
        if engine
            .room()
            .is_some_and(|current| ids_match(&current.id, &room.id))
        {
            engine.apply_snapshot(room.clone());
        }
        Ok(room)
    }

    pub async fn leave_room(&self) -> Result<(), SyncError> {
        self.join_epoch.fetch_add(1, Ordering::SeqCst);
        let room_id = {
            let mut engine = self.engine.write().await;
            let room_id = engine.room().map(|room| room.id.clone());
            engine.leave();
            room_id
        };
        let Some(room_id) = room_id else {
            return Ok(());
        };
        info!(%room_id, "left room");
        self.transport.leave_room(room_id).await;
        if let Err(e) = self.store.clear_last_room() {
            warn!(error = %e, "failed to clear rejoin hint");
        }
        Ok(())
    }

    /// Host action; the backend rejects non-hosts, this only
    /// propagates its answer.
    pub async fn start_session(
        &self,
        topic: &str,
        topic_link: Option<&str>,
    ) -> Result<Session, SyncError> {
        let room_id = {
            let engine = self.engine.read().await;
            engine
                .room()
                .map(|room| room.id.clone())
                .ok_or(SyncError::NoRoom)?
        };
        let session = self.api.start_session(&room_id, topic, topic_link).await?;
        self.engine
            .write()
            .await
            .apply_event(ServerEvent::SessionStarted(session.clone()));
        Ok(session)
    }

    /// REST-first with an optimistic local placeholder, rolled back if
    /// the backend refuses. Refused outright while offline: peers would
    /// never learn of the vote and reveal would hang on them.
    pub async fn cast_vote(&self, card: CardValue) -> Result<(), SyncError> {
        if !self.transport.is_connected().await {
            return Err(SyncError::Offline);
        }
        let (session_id, me) = {
            let engine = self.engine.read().await;
            let session = engine.session().ok_or(SyncError::NoSession)?;
            (session.id.clone(), engine.identity().anonymous_id.clone())
        };
        self.engine.write().await.note_vote(&me);
        match self.api.cast_vote(&session_id, card).await {
            Ok(()) => {
                self.transport
                    .emit(ClientEvent::VoteCast {
                        session_id,
                        vote: card,
                    })
                    .await;
                Ok(())
            }
            Err(e) => {
                self.engine.write().await.retract_vote(&me);
                Err(e.into())
            }
        }
    }

    /// The engine stays in `Collecting` until the authoritative
    /// `votes_revealed` push lands; only the backend knows the values.
    pub async fn reveal_votes(&self) -> Result<(), SyncError> {
        let session_id = self.session_id().await.ok_or(SyncError::NoSession)?;
        self.api.reveal_votes(&session_id).await?;
        self.transport
            .emit(ClientEvent::RevealVotes { session_id })
            .await;
        Ok(())
    }

    /// Reset has no REST endpoint: it is advisory-push only, applied
    /// locally at once and echoed to peers.
    pub async fn reset_votes(&self) -> Result<(), SyncError> {
        let session_id = self.session_id().await.ok_or(SyncError::NoSession)?;
        if !self.transport.is_connected().await {
            return Err(SyncError::Offline);
        }
        self.transport
            .emit(ClientEvent::ResetVotes { session_id })
            .await;
        self.engine.write().await.apply_event(ServerEvent::VotesReset);
        Ok(())
    }

    /// Forget everything local: room, identity, connection.
    pub async fn logout(&self) -> Result<(), SyncError> {
        self.join_epoch.fetch_add(1, Ordering::SeqCst);
        {
            // disconnect() drops subscribers, so the pump will not see
            // this transition; reflect it here
            let mut engine = self.engine.write().await;
            engine.leave();
            engine.set_connection(false);
        }
        self.transport.disconnect().await;
        self.store.clear_all()?;
        info!("logged out, local profile cleared");
        Ok(())
    }

    async fn session_id(&self) -> Option<String> {
        self.engine
            .read()
            .await
            .session()
            .map(|session| session.id.clone())
    }

    fn begin_join(&self) -> u64 {
        self.join_epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn finish_join(&self, epoch: u64, room: Room) -> Result<Room, SyncError> {
        if self.join_epoch.load(Ordering::SeqCst) != epoch {
            debug!(room_id = %room.id, "stale join response discarded");
            return Err(SyncError::Superseded);
        }
        self.engine.write().await.apply_snapshot(room.clone());
        self.transport.join_room(room.id.clone()).await;
        if let Err(e) = self.store.set_last_room(&room.id) {
            warn!(error = %e, "failed to persist rejoin hint");
        }
        info!(room_id = %room.id, "joined room");
        Ok(room)
    }
}

/// Forwards transport events into the engine. On a reconnect the
/// tracked room is re-subscribed; the backend treats a duplicate join
/// as a no-op.
async fn run_pump(
    engine: Arc<RwLock<RoomEngine>>,
    transport: Arc<TransportSession>,
    mut rx: UnboundedReceiver<TransportEvent>,
) {
    while let Some(event) = rx.recv().await {
        match event {
            TransportEvent::Connected { reconnect } => {
                let room_id = {
                    let mut engine = engine.write().await;
                    engine.set_connection(true);
                    engine.room().map(|room| room.id.clone())
                };
                if reconnect {
                    if let Some(room_id) = room_id {
                        debug!(%room_id, "re-subscribing room after reconnect");
                        transport.join_room(room_id).await;
                    }
                }
            }
            TransportEvent::Disconnected => {
                engine.write().await.set_connection(false);
            }
            TransportEvent::Error(message) => {
                warn!(%message, "push channel error");
            }
            TransportEvent::Server(event) => {
                engine.write().await.apply_event(event);
            }
        }
    }
}
