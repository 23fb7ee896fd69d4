use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use poker_types::{ClientEvent, Identity, RoomId, ServerEvent};

use super::{Connector, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// What subscribers see: lifecycle transitions plus every decoded
/// server event, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// `reconnect` is false only for the first successful connect of a
    /// session; subscribers use it to decide whether to re-subscribe
    /// room membership.
    Connected { reconnect: bool },
    Disconnected,
    Error(String),
    Server(ServerEvent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Owns the push connection for the lifetime of the client.
///
/// Wraps a [`Connector`] with the policy the rest of the client relies
/// on: typed fan-out to subscribers, a pending-join queue flushed
/// exactly once per successful connect, and automatic reconnection
/// after an unexpected drop. All methods take `&self`; the session is
/// shared behind an `Arc`.
pub struct TransportSession {
    connector: Arc<dyn Connector>,
    reconnect_delay: Duration,
    state: RwLock<ConnectionState>,
    identity: RwLock<Option<Identity>>,
    outbound: RwLock<Option<UnboundedSender<ClientEvent>>>,
    subscribers: RwLock<HashMap<SubscriberId, UnboundedSender<TransportEvent>>>,
    pending_joins: Mutex<Vec<RoomId>>,
    /// Bumped by `disconnect` so a reader task for a torn-down
    /// connection cannot trigger a reconnect.
    generation: AtomicU64,
    shutdown: AtomicBool,
    ever_connected: AtomicBool,
}

impl TransportSession {
    pub fn new(connector: Arc<dyn Connector>, reconnect_delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            connector,
            reconnect_delay,
            state: RwLock::new(ConnectionState::Disconnected),
            identity: RwLock::new(None),
            outbound: RwLock::new(None),
            subscribers: RwLock::new(HashMap::new()),
            pending_joins: Mutex::new(Vec::new()),
            generation: AtomicU64::new(0),
            shutdown: AtomicBool::new(false),
            ever_connected: AtomicBool::new(false),
        })
    }

    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    pub async fn is_connected(&self) -> bool {
        self.state().await == ConnectionState::Connected
    }

    /// Registers a subscriber for all future transport events.
    pub async fn subscribe(&self) -> (SubscriberId, UnboundedReceiver<TransportEvent>) {
        let id = SubscriberId::new();
        let (tx, rx) = unbounded_channel();
        self.subscribers.write().await.insert(id, tx);
        (id, rx)
    }

    pub async fn unsubscribe(&self, id: SubscriberId) {
        self.subscribers.write().await.remove(&id);
    }

    /// Opens the connection. Refuses without an identity; a no-op when
    /// already connected. On failure the error is returned *and*
    /// broadcast, and reconnection keeps running in the background
    /// until it succeeds or `disconnect` is called.
    pub async fn connect(self: &Arc<Self>, identity: Identity) -> Result<(), TransportError> {
        if identity.is_empty() {
            return Err(TransportError::MissingIdentity);
        }
        match *self.state.read().await {
            ConnectionState::Connected => {
                debug!("connect called while already connected, ignoring");
                return Ok(());
            }
            // a foreground call or the reconnect loop already has an
            // open in flight; opening a second link would orphan a
            // reader task that keeps broadcasting
            ConnectionState::Connecting => {
                debug!("connect already in progress, ignoring");
                return Ok(());
            }
            ConnectionState::Disconnected => {}
        }
        self.shutdown.store(false, Ordering::SeqCst);
        *self.identity.write().await = Some(identity);
        *self.state.write().await = ConnectionState::Connecting;

        match self.open_and_run().await {
            Ok(()) => Ok(()),
            Err(e) => {
                if !self.shutdown.load(Ordering::SeqCst) {
                    let session = Arc::clone(self);
                    tokio::spawn(async move { session.reconnect_loop().await });
                }
                Err(e)
            }
        }
    }

    /// Deliberate teardown. The reader task for the current connection
    /// is orphaned via the generation bump and will not reconnect.
    pub async fn disconnect(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.ever_connected.store(false, Ordering::SeqCst);
        *self.state.write().await = ConnectionState::Disconnected;
        *self.outbound.write().await = None;
        *self.identity.write().await = None;
        self.pending_joins.lock().await.clear();
        self.subscribers.write().await.clear();
        info!("push channel closed");
    }

    /// Subscribes to a room's events, queueing the request if the
    /// connection is not up yet. Queued joins are flushed once, on the
    /// next successful connect.
    pub async fn join_room(&self, room_id: RoomId) {
        if self.send(ClientEvent::JoinRoom {
            room_id: room_id.clone(),
        })
        .await
        {
            return;
        }
        let mut pending = self.pending_joins.lock().await;
        if !pending.contains(&room_id) {
            debug!(%room_id, "queueing room join until connected");
            pending.push(room_id);
        }
    }

    pub async fn leave_room(&self, room_id: RoomId) {
        self.pending_joins.lock().await.retain(|id| *id != room_id);
        self.send(ClientEvent::LeaveRoom { room_id }).await;
    }

    /// Advisory fan-out. Dropped silently while disconnected; the
    /// authoritative change already happened over REST.
    pub async fn emit(&self, event: ClientEvent) {
        if !self.send(event).await {
            debug!("push channel down, advisory event dropped");
        }
    }

    async fn send(&self, event: ClientEvent) -> bool {
        let outbound = self.outbound.read().await;
        match outbound.as_ref() {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }

    async fn open_and_run(self: &Arc<Self>) -> Result<(), TransportError> {
        let identity = self
            .identity
            .read()
            .await
            .clone()
            .ok_or(TransportError::MissingIdentity)?;

        let channel = match self.connector.open(&identity).await {
            Ok(channel) => channel,
            Err(e) => {
                *self.state.write().await = ConnectionState::Disconnected;
                self.broadcast(TransportEvent::Error(e.to_string())).await;
                return Err(e);
            }
        };

        *self.outbound.write().await = Some(channel.outbound);
        *self.state.write().await = ConnectionState::Connected;
        self.flush_pending_joins().await;

        let reconnect = self.ever_connected.swap(true, Ordering::SeqCst);
        info!(reconnect, "push channel connected");
        self.broadcast(TransportEvent::Connected { reconnect }).await;

        let generation = self.generation.load(Ordering::SeqCst);
        let session = Arc::clone(self);
        tokio::spawn(async move { session.run_connection(channel.inbound, generation).await });
        Ok(())
    }

    async fn flush_pending_joins(&self) {
        let pending: Vec<RoomId> = self.pending_joins.lock().await.drain(..).collect();
        for room_id in pending {
            debug!(%room_id, "flushing queued room join");
            self.send(ClientEvent::JoinRoom { room_id }).await;
        }
    }

    async fn run_connection(self: Arc<Self>, mut inbound: UnboundedReceiver<ServerEvent>, generation: u64) {
        while let Some(event) = inbound.recv().await {
            debug!(event = event.name(), "server event received");
            self.broadcast(TransportEvent::Server(event)).await;
        }

        // Channel closed: either the server dropped us or disconnect()
        // tore the connection down. Only the former reconnects.
        if self.generation.load(Ordering::SeqCst) != generation {
            return;
        }
        warn!("push channel dropped unexpectedly");
        *self.state.write().await = ConnectionState::Disconnected;
        *self.outbound.write().await = None;
        self.broadcast(TransportEvent::Disconnected).await;
        self.reconnect_loop().await;
    }

    // Boxed (rather than `async fn`) to break the recursive opaque-type
    // cycle reconnect_loop -> open_and_run -> spawn(run_connection) ->
    // reconnect_loop, which otherwise prevents `Send` inference.
    fn reconnect_loop(
        self: &Arc<Self>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send>> {
        let session = Arc::clone(self);
        Box::pin(async move {
            loop {
                if session.shutdown.load(Ordering::SeqCst) {
                    return;
                }
                tokio::time::sleep(session.reconnect_delay).await;
                if session.shutdown.load(Ordering::SeqCst) || session.is_connected().await {
                    return;
                }
                *session.state.write().await = ConnectionState::Connecting;
                match session.open_and_run().await {
                    Ok(()) => return,
                    Err(e) => warn!(error = %e, "reconnect attempt failed"),
                }
            }
        })
    }

    async fn broadcast(&self, event: TransportEvent) {
        let mut dead = Vec::new();
        {
            let subscribers = self.subscribers.read().await;
            for (id, tx) in subscribers.iter() {
                if tx.send(event.clone()).is_err() {
                    dead.push(*id);
                }
            }
        }
        if !dead.is_empty() {
            let mut subscribers = self.subscribers.write().await;
            for id in dead {
                debug!(subscriber = %id, "dropping dead subscriber");
                subscribers.remove(&id);
            }
        }
    }
}
