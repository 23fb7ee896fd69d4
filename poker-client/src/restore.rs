use std::sync::Arc;

use tracing::{info, warn};

use poker_persistence::ProfileStore;
use poker_types::Identity;

use crate::sync::{SyncError, SyncService};
use crate::transport::TransportError;

/// Where startup should land the user.
#[derive(Debug, Clone, PartialEq)]
pub enum RestoreOutcome {
    /// No stored identity; the caller must ask for a name first.
    NeedsIdentity,
    /// Back in the previously joined room.
    Rejoined(String),
    /// No room to go back to; show the room list.
    RoomList,
}

/// Startup flow: reconnect with the stored identity and try to rejoin
/// the last room. A stale rejoin hint (room gone, join refused) is
/// cleared rather than surfaced; the user just lands on the room list.
pub struct SessionRestore {
    store: Arc<ProfileStore>,
}

impl SessionRestore {
    pub fn new(store: Arc<ProfileStore>) -> Self {
        Self { store }
    }

    pub fn identity(&self) -> Option<Identity> {
        self.store.load().identity
    }

    pub async fn resume(&self, service: &Arc<SyncService>) -> Result<RestoreOutcome, SyncError> {
        if self.identity().is_none() {
            return Ok(RestoreOutcome::NeedsIdentity);
        }

        if let Err(e) = service.start().await {
            match e {
                TransportError::MissingIdentity => return Err(e.into()),
                _ => warn!(error = %e, "push channel down, reconnecting in background"),
            }
        }

        let Some(room_id) = self.store.last_room() else {
            return Ok(RestoreOutcome::RoomList);
        };
        match service.join_room(&room_id).await {
            Ok(room) => {
                info!(room_id = %room.id, "restored previous room");
                Ok(RestoreOutcome::Rejoined(room.id))
            }
            Err(e) => {
                warn!(%room_id, error = %e, "stored room rejoin failed, clearing hint");
                if let Err(e) = self.store.clear_last_room() {
                    warn!(error = %e, "failed to clear rejoin hint");
                }
                Ok(RestoreOutcome::RoomList)
            }
        }
    }
}
