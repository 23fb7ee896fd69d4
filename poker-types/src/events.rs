use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::room::{Room, RoomId};
use crate::session::{Session, SessionId};
use crate::user::{AnonymousId, Participant};
use crate::vote::CardValue;

/// One revealed vote in a `votes_revealed` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RevealedVote {
    pub anonymous_id: AnonymousId,
    #[ts(type = "number | string")]
    pub vote: CardValue,
}

/// Push events consumed from the backend. The closed set of tags is the
/// wire contract; anything else on the channel is ignored upstream.
///
/// Before reveal the backend only ever says *that* someone voted
/// (`VoteUpdated` carries no value); `VotesRevealed` carries the full
/// authoritative list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    SessionStarted(Session),
    #[serde(rename_all = "camelCase")]
    VoteUpdated { anonymous_id: AnonymousId },
    VotesRevealed { votes: Vec<RevealedVote> },
    VotesReset,
    SessionEnded,
    #[serde(rename_all = "camelCase")]
    RoomUpdated { room_id: RoomId, room: Room },
    UserJoined { user: Participant },
    UserDisconnected { user: Participant },
}

impl ServerEvent {
    /// Stable tag for log lines.
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::SessionStarted(_) => "session_started",
            ServerEvent::VoteUpdated { .. } => "vote_updated",
            ServerEvent::VotesRevealed { .. } => "votes_revealed",
            ServerEvent::VotesReset => "votes_reset",
            ServerEvent::SessionEnded => "session_ended",
            ServerEvent::RoomUpdated { .. } => "room_updated",
            ServerEvent::UserJoined { .. } => "user_joined",
            ServerEvent::UserDisconnected { .. } => "user_disconnected",
        }
    }
}

/// Events emitted by the client.
///
/// Room subscription management plus advisory fan-out: the
/// authoritative change has already happened over REST, these let peers
/// update faster than polling. Fire-and-forget, no acknowledgement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    #[serde(rename_all = "camelCase")]
    JoinRoom { room_id: RoomId },
    #[serde(rename_all = "camelCase")]
    LeaveRoom { room_id: RoomId },
    #[serde(rename_all = "camelCase")]
    VoteCast {
        session_id: SessionId,
        #[ts(type = "number | string")]
        vote: CardValue,
    },
    #[serde(rename_all = "camelCase")]
    RevealVotes { session_id: SessionId },
    #[serde(rename_all = "camelCase")]
    ResetVotes { session_id: SessionId },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_event_wire_shape() {
        let json = r#"{"event":"vote_updated","data":{"anonymousId":"anon-1"}}"#;
        let event: ServerEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            event,
            ServerEvent::VoteUpdated {
                anonymous_id: "anon-1".to_string()
            }
        );
    }

    #[test]
    fn test_unit_event_needs_no_data() {
        let event: ServerEvent = serde_json::from_str(r#"{"event":"votes_reset"}"#).unwrap();
        assert_eq!(event, ServerEvent::VotesReset);
    }

    #[test]
    fn test_revealed_votes_mix_numbers_and_strings() {
        let json = r#"{"event":"votes_revealed","data":{"votes":[
            {"anonymousId":"a","vote":5},
            {"anonymousId":"b","vote":"?"}
        ]}}"#;
        let event: ServerEvent = serde_json::from_str(json).unwrap();
        let ServerEvent::VotesRevealed { votes } = event else {
            panic!("wrong variant");
        };
        assert_eq!(votes[0].vote, CardValue::Number(5));
        assert_eq!(votes[1].vote, CardValue::Unsure);
    }

    #[test]
    fn test_client_event_serializes_with_envelope() {
        let event = ClientEvent::VoteCast {
            session_id: "s1".to_string(),
            vote: CardValue::Number(8),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "vote_cast");
        assert_eq!(json["data"]["sessionId"], "s1");
        assert_eq!(json["data"]["vote"], 8);
    }
}
