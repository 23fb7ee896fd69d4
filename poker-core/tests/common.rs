use poker_core::RoomEngine;
use poker_types::{Identity, Participant, Role, Room, Session};

pub fn create_test_identity(name: &str) -> Identity {
    Identity::new(name, format!("anon-{}", name.to_lowercase()))
}

pub fn create_test_participant(name: &str, role: Role) -> Participant {
    Participant {
        anonymous_id: format!("anon-{}", name.to_lowercase()),
        name: name.to_string(),
        role,
    }
}

pub fn create_test_room(id: &str, host: &str, members: &[(&str, Role)]) -> Room {
    Room {
        id: id.to_string(),
        name: "Sprint 24 Planning".to_string(),
        host_anonymous_id: format!("anon-{}", host.to_lowercase()),
        invite_code: "INV-42".to_string(),
        is_active: true,
        participants: members
            .iter()
            .map(|(name, role)| create_test_participant(name, *role))
            .collect(),
    }
}

pub fn create_test_session(id: &str, room_id: &str, topic: &str) -> Session {
    Session {
        id: id.to_string(),
        room_id: room_id.to_string(),
        topic: topic.to_string(),
        topic_link: None,
        revealed: false,
    }
}

pub fn create_standard_engine() -> RoomEngine {
    let mut engine = RoomEngine::new(create_test_identity("Alice"));
    engine.apply_snapshot(create_test_room(
        "room-1",
        "Alice",
        &[
            ("Alice", Role::Participant),
            ("Bob", Role::Participant),
            ("Carol", Role::Observer),
        ],
    ));
    engine
}
