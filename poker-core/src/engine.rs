use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::events::{EngineEvent, EngineEventBus, EngineEventHandler};
use crate::tally::VoteTally;
use poker_types::{
    AnonymousId, CardValue, Identity, Room, RoomId, ServerEvent, Session, ids_match,
};

/// Where the active round stands, derived from the tracked session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VotingPhase {
    NoSession,
    Collecting,
    Revealed,
}

/// A tracked vote for one participant.
///
/// `Hidden` is the pre-reveal placeholder: the engine knows *that* the
/// participant voted, never *what*, until a `votes_revealed` push
/// replaces the whole map. The placeholder is an internal sentinel and
/// never reaches aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum VoteSlot {
    Hidden,
    Cast(CardValue),
}

impl VoteSlot {
    pub fn value(&self) -> Option<CardValue> {
        match self {
            VoteSlot::Hidden => None,
            VoteSlot::Cast(card) => Some(*card),
        }
    }
}

/// Read-only view of engine state for adapters. Cloned out on request
/// so views never hold a live borrow into the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineSnapshot {
    pub room: Option<Room>,
    pub session: Option<Session>,
    pub votes: HashMap<AnonymousId, VoteSlot>,
    pub phase: VotingPhase,
    pub all_votes_in: bool,
    pub is_host: bool,
    pub connected: bool,
}

/// The client-side reconciliation engine.
///
/// Merges REST snapshots and push events into one authoritative
/// in-memory model of {room, participants, session, votes}. Ordering
/// across the two channels is not guaranteed, so every merge here is
/// idempotent, scoped to the tracked room, and replace-based rather
/// than incremental: applying the same input twice, or inputs out of
/// order, converges to the same state.
pub struct RoomEngine {
    identity: Identity,
    room: Option<Room>,
    session: Option<Session>,
    votes: HashMap<AnonymousId, VoteSlot>,
    connected: bool,
    /// Set once a `room_updated` push has been applied for the tracked
    /// room. A REST snapshot never overwrites push state: pushes are
    /// strictly newer.
    room_from_push: bool,
    bus: EngineEventBus,
}

impl RoomEngine {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            room: None,
            session: None,
            votes: HashMap::new(),
            connected: false,
            room_from_push: false,
            bus: EngineEventBus::new(),
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn room(&self) -> Option<&Room> {
        self.room.as_ref()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn votes(&self) -> &HashMap<AnonymousId, VoteSlot> {
        &self.votes
    }

    pub fn connected(&self) -> bool {
        self.connected
    }

    pub fn add_handler(&mut self, handler: Box<dyn EngineEventHandler>) {
        self.bus.add_handler(handler);
    }

    pub fn phase(&self) -> VotingPhase {
        match &self.session {
            None => VotingPhase::NoSession,
            Some(session) if session.revealed => VotingPhase::Revealed,
            Some(_) => VotingPhase::Collecting,
        }
    }

    /// Advisory host check; the backend is the enforcement point.
    pub fn is_host(&self) -> bool {
        self.room
            .as_ref()
            .is_some_and(|room| room.is_hosted_by(&self.identity.anonymous_id))
    }

    /// Every participant with the voter role has an entry, and the
    /// voter set is non-empty. Recomputed on demand because
    /// participants and votes change independently.
    pub fn all_votes_in(&self) -> bool {
        let Some(room) = &self.room else {
            return false;
        };
        let mut voters = room.voters().peekable();
        if voters.peek().is_none() {
            return false;
        }
        voters.all(|p| self.votes.contains_key(&p.anonymous_id))
    }

    pub fn has_voted(&self, anonymous_id: &str) -> bool {
        self.votes.contains_key(anonymous_id)
    }

    /// Aggregated results, available only after reveal.
    pub fn tally(&self) -> Option<VoteTally> {
        if self.phase() != VotingPhase::Revealed {
            return None;
        }
        let revealed: Vec<CardValue> = self.votes.values().filter_map(VoteSlot::value).collect();
        Some(VoteTally::from_votes(&revealed))
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            room: self.room.clone(),
            session: self.session.clone(),
            votes: self.votes.clone(),
            phase: self.phase(),
            all_votes_in: self.all_votes_in(),
            is_host: self.is_host(),
            connected: self.connected,
        }
    }

    /// Apply the authoritative baseline returned by the join call.
    ///
    /// If a push for the same room already arrived, the snapshot is
    /// stale by definition and ignored. Switching rooms drops the old
    /// session and votes.
    pub fn apply_snapshot(&mut self, room: Room) {
        if let Some(current) = &self.room {
            if ids_match(&current.id, &room.id) {
                if self.room_from_push {
                    debug!(room_id = %room.id, "snapshot ignored, push state is newer");
                    return;
                }
            } else {
                self.clear_round();
            }
        }
        let room_id = room.id.clone();
        self.room = Some(room);
        self.room_from_push = false;
        self.bus.publish(EngineEvent::RoomChanged { room_id });
    }

    /// Leave the tracked room entirely.
    pub fn leave(&mut self) {
        self.room = None;
        self.room_from_push = false;
        self.clear_round();
        self.bus.publish(EngineEvent::LeftRoom);
    }

    pub fn set_connection(&mut self, connected: bool) {
        if self.connected == connected {
            return;
        }
        self.connected = connected;
        self.bus
            .publish(EngineEvent::ConnectionChanged { connected });
    }

    /// Optimistic placeholder for the local user's own vote. Rolled
    /// back with `retract_vote` if the authoritative call fails; the
    /// push echo is idempotent against it.
    pub fn note_vote(&mut self, anonymous_id: &str) {
        self.record_placeholder(anonymous_id.to_string());
    }

    pub fn retract_vote(&mut self, anonymous_id: &str) {
        // Only a placeholder can be rolled back; revealed values are
        // authoritative.
        if matches!(self.votes.get(anonymous_id), Some(VoteSlot::Hidden)) {
            self.votes.remove(anonymous_id);
        }
    }

    /// Apply one push event. Events scoped to a room or session the
    /// engine no longer tracks are discarded silently (logged, never
    /// surfaced).
    pub fn apply_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::SessionStarted(session) => self.on_session_started(session),
            ServerEvent::VoteUpdated { anonymous_id } => self.record_placeholder(anonymous_id),
            ServerEvent::VotesRevealed { votes } => self.on_votes_revealed(votes),
            ServerEvent::VotesReset => self.on_votes_reset(),
            ServerEvent::SessionEnded => self.on_session_ended(),
            ServerEvent::RoomUpdated { room_id, room } => self.on_room_updated(room_id, room),
            ServerEvent::UserJoined { user } => self.on_user_joined(user),
            ServerEvent::UserDisconnected { user } => self.on_user_disconnected(user),
        }
    }

    fn clear_round(&mut self) {
        self.session = None;
        self.votes.clear();
    }

    fn on_session_started(&mut self, mut session: Session) {
        let Some(room) = &self.room else {
            debug!(event = "session_started", "discarded, no tracked room");
            return;
        };
        if !ids_match(&room.id, &session.room_id) {
            debug!(
                event = "session_started",
                session_room = %session.room_id,
                tracked_room = %room.id,
                "discarded, room mismatch"
            );
            return;
        }
        // A new round always starts collecting, whatever the payload says
        session.revealed = false;
        let session_id = session.id.clone();
        self.votes.clear();
        self.session = Some(session);
        self.bus.publish(EngineEvent::SessionStarted { session_id });
    }

    fn record_placeholder(&mut self, anonymous_id: AnonymousId) {
        if self.phase() != VotingPhase::Collecting {
            debug!(event = "vote_updated", %anonymous_id, "discarded, not collecting");
            return;
        }
        if self.votes.contains_key(&anonymous_id) {
            return; // duplicate indicator, nothing changed
        }
        self.votes.insert(anonymous_id.clone(), VoteSlot::Hidden);
        self.bus.publish(EngineEvent::VoteRecorded { anonymous_id });
    }

    fn on_votes_revealed(&mut self, votes: Vec<poker_types::RevealedVote>) {
        let Some(session) = &mut self.session else {
            debug!(event = "votes_revealed", "discarded, no session");
            return;
        };
        // Full authoritative replace, not a merge: a voter missing from
        // the payload is removed, so no stale placeholder survives.
        self.votes = votes
            .into_iter()
            .map(|v| (v.anonymous_id, VoteSlot::Cast(v.vote)))
            .collect();
        session.revealed = true;
        let session_id = session.id.clone();
        self.bus.publish(EngineEvent::VotesRevealed { session_id });
    }

    fn on_votes_reset(&mut self) {
        let Some(session) = &mut self.session else {
            debug!(event = "votes_reset", "discarded, no session");
            return;
        };
        session.revealed = false;
        let session_id = session.id.clone();
        self.votes.clear();
        self.bus.publish(EngineEvent::VotesReset { session_id });
    }

    fn on_session_ended(&mut self) {
        if self.session.is_none() {
            debug!(event = "session_ended", "discarded, no session");
            return;
        }
        self.clear_round();
        self.bus.publish(EngineEvent::SessionEnded);
    }

    fn on_room_updated(&mut self, room_id: RoomId, room: Room) {
        let Some(current) = &self.room else {
            debug!(event = "room_updated", %room_id, "discarded, no tracked room");
            return;
        };
        if !ids_match(&current.id, &room_id) {
            debug!(
                event = "room_updated",
                pushed_room = %room_id,
                tracked_room = %current.id,
                "discarded, room mismatch"
            );
            return;
        }
        self.room_from_push = true;
        if current == &room {
            return; // identical snapshot, nothing to publish
        }
        let room_id = room.id.clone();
        self.room = Some(room);
        self.bus.publish(EngineEvent::RoomChanged { room_id });
    }

    fn on_user_joined(&mut self, user: poker_types::Participant) {
        let Some(room) = &mut self.room else {
            debug!(event = "user_joined", "discarded, no tracked room");
            return;
        };
        if let Some(existing) = room
            .participants
            .iter_mut()
            .find(|p| ids_match(&p.anonymous_id, &user.anonymous_id))
        {
            *existing = user;
            return;
        }
        let anonymous_id = user.anonymous_id.clone();
        room.participants.push(user);
        self.bus
            .publish(EngineEvent::ParticipantJoined { anonymous_id });
    }

    fn on_user_disconnected(&mut self, user: poker_types::Participant) {
        let Some(room) = &mut self.room else {
            debug!(event = "user_disconnected", "discarded, no tracked room");
            return;
        };
        let before = room.participants.len();
        room.participants
            .retain(|p| !ids_match(&p.anonymous_id, &user.anonymous_id));
        if room.participants.len() == before {
            return;
        }
        // Drop their pending vote so completeness cannot wait on a gone
        // peer; the next authoritative room_updated corrects either way.
        self.votes.remove(&user.anonymous_id);
        self.bus.publish(EngineEvent::ParticipantLeft {
            anonymous_id: user.anonymous_id,
        });
    }
}
