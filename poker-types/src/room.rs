use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::user::{AnonymousId, Participant};

pub type RoomId = String;

/// Compare backend identifiers as normalized strings.
///
/// A freshly fetched snapshot and a previously stored copy can disagree
/// on surrounding whitespace after round-tripping through the backend,
/// and an id-typed mismatch must read as "different room", never as a
/// panic or a bogus match on empty input.
pub fn ids_match(a: &str, b: &str) -> bool {
    let a = a.trim();
    !a.is_empty() && a == b.trim()
}

/// Cached copy of a backend-owned room. Replaced wholesale by
/// authoritative pushes or REST refetches, never merged field by field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub host_anonymous_id: AnonymousId,
    pub invite_code: String,
    pub is_active: bool,
    #[serde(default)]
    pub participants: Vec<Participant>,
}

impl Room {
    pub fn participant(&self, anonymous_id: &str) -> Option<&Participant> {
        self.participants
            .iter()
            .find(|p| ids_match(&p.anonymous_id, anonymous_id))
    }

    /// Advisory only: the backend is the enforcement point for host
    /// authority. Use this to hide controls, never to gate state.
    pub fn is_hosted_by(&self, anonymous_id: &str) -> bool {
        ids_match(&self.host_anonymous_id, anonymous_id)
    }

    pub fn voters(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter().filter(|p| p.is_voter())
    }
}
