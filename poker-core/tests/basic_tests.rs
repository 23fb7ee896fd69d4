mod common;

use common::*;
use poker_core::{VoteSlot, VotingPhase};
use poker_types::{CardValue, RevealedVote, ServerEvent};

#[test]
fn test_engine_creation() {
    let engine = create_standard_engine();
    assert_eq!(engine.room().unwrap().participants.len(), 3);
    assert_eq!(engine.phase(), VotingPhase::NoSession);
    assert!(engine.is_host());
}

#[test]
fn test_full_round_through_push_events() {
    let mut engine = create_standard_engine();
    engine.apply_event(ServerEvent::SessionStarted(create_test_session(
        "s1", "room-1", "Login flow",
    )));
    assert_eq!(engine.phase(), VotingPhase::Collecting);

    for voter in ["anon-alice", "anon-bob"] {
        engine.apply_event(ServerEvent::VoteUpdated {
            anonymous_id: voter.to_string(),
        });
    }
    assert!(engine.all_votes_in());
    assert_eq!(engine.votes().get("anon-bob"), Some(&VoteSlot::Hidden));

    engine.apply_event(ServerEvent::VotesRevealed {
        votes: vec![
            RevealedVote {
                anonymous_id: "anon-alice".to_string(),
                vote: CardValue::Number(5),
            },
            RevealedVote {
                anonymous_id: "anon-bob".to_string(),
                vote: CardValue::Number(8),
            },
        ],
    });
    let tally = engine.tally().expect("revealed round has a tally");
    assert_eq!(tally.average, Some(6.5));
    assert!(!tally.consensus);

    engine.apply_event(ServerEvent::VotesReset);
    assert_eq!(engine.phase(), VotingPhase::Collecting);
    assert_eq!(engine.session().unwrap().id, "s1");
    assert!(engine.votes().is_empty());
}

#[test]
fn test_events_for_untracked_room_are_ignored() {
    let mut engine = create_standard_engine();
    let before = engine.snapshot();

    engine.apply_event(ServerEvent::SessionStarted(create_test_session(
        "s9",
        "some-other-room",
        "Unrelated",
    )));
    engine.apply_event(ServerEvent::RoomUpdated {
        room_id: "some-other-room".to_string(),
        room: create_test_room("some-other-room", "Mallory", &[]),
    });

    assert_eq!(engine.snapshot(), before);
}
