use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Backend-issued identifiers are opaque strings.
pub type AnonymousId = String;

/// Anonymous identity for this device profile.
///
/// `anonymous_id` is the only key used to correlate a person across the
/// REST and push views. `name` is display-only and may change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub name: String,
    pub anonymous_id: AnonymousId,
}

impl Identity {
    pub fn new(name: impl Into<String>, anonymous_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            anonymous_id: anonymous_id.into(),
        }
    }

    /// An identity with a blank name or id must never reach the wire.
    pub fn is_empty(&self) -> bool {
        self.name.trim().is_empty() || self.anonymous_id.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Participant,
    Observer,
}

/// A room member as the backend reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub anonymous_id: AnonymousId,
    pub name: String,
    pub role: Role,
}

impl Participant {
    /// Observers never cast votes and are excluded from completeness checks.
    pub fn is_voter(&self) -> bool {
        self.role == Role::Participant
    }
}
