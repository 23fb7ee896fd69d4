use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::room::RoomId;

pub type SessionId = String;

/// One estimation round within a room. At most one is active per room;
/// a reset keeps the same session, ending it yields none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: SessionId,
    pub room_id: RoomId,
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_link: Option<String>,
    pub revealed: bool,
}
