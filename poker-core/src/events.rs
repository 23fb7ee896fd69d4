use poker_types::{AnonymousId, RoomId, SessionId};

/// Notifications published by the engine after a state change has been
/// applied. Discarded inputs (mismatched room, duplicate snapshot)
/// publish nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    RoomChanged { room_id: RoomId },
    ParticipantJoined { anonymous_id: AnonymousId },
    ParticipantLeft { anonymous_id: AnonymousId },
    SessionStarted { session_id: SessionId },
    VoteRecorded { anonymous_id: AnonymousId },
    VotesRevealed { session_id: SessionId },
    VotesReset { session_id: SessionId },
    SessionEnded,
    ConnectionChanged { connected: bool },
    LeftRoom,
}

/// Handler trait for view adapters observing engine changes.
pub trait EngineEventHandler: Send + Sync {
    fn handle_event(&mut self, event: EngineEvent);
}

/// Distributes engine events to registered handlers.
pub struct EngineEventBus {
    handlers: Vec<Box<dyn EngineEventHandler>>,
}

impl EngineEventBus {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    pub fn add_handler(&mut self, handler: Box<dyn EngineEventHandler>) {
        self.handlers.push(handler);
    }

    pub fn publish(&mut self, event: EngineEvent) {
        for handler in &mut self.handlers {
            handler.handle_event(event.clone());
        }
    }
}

impl Default for EngineEventBus {
    fn default() -> Self {
        Self::new()
    }
}
