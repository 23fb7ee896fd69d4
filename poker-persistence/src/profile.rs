use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use poker_types::{Identity, RoomId};

/// Everything this client persists across restarts: the anonymous
/// identity and a "last joined room" rejoin hint. Vote and session
/// state is deliberately never written here; the backend owns it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default)]
    pub identity: Option<Identity>,
    #[serde(default)]
    pub last_room_id: Option<RoomId>,
}

/// JSON-file-backed durable store for the local profile.
///
/// Reads are tolerant: a missing file is an empty profile, and a
/// corrupt file is treated as absent and removed so the next write
/// starts clean.
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Profile {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(_) => return Profile::default(),
        };
        match serde_json::from_str(&raw) {
            Ok(profile) => profile,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "corrupt profile discarded");
                let _ = fs::remove_file(&self.path);
                Profile::default()
            }
        }
    }

    pub fn save(&self, profile: &Profile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating profile dir {}", parent.display()))?;
            }
        }
        let raw = serde_json::to_string_pretty(profile)?;
        fs::write(&self.path, raw)
            .with_context(|| format!("writing profile {}", self.path.display()))?;
        Ok(())
    }

    pub fn set_identity(&self, identity: &Identity) -> Result<()> {
        let mut profile = self.load();
        profile.identity = Some(identity.clone());
        self.save(&profile)
    }

    pub fn set_last_room(&self, room_id: &str) -> Result<()> {
        let mut profile = self.load();
        profile.last_room_id = Some(room_id.to_string());
        self.save(&profile)
    }

    pub fn last_room(&self) -> Option<RoomId> {
        self.load().last_room_id
    }

    pub fn clear_last_room(&self) -> Result<()> {
        let mut profile = self.load();
        if profile.last_room_id.take().is_some() {
            self.save(&profile)?;
        }
        Ok(())
    }

    /// Explicit logout: drops the identity and the rejoin hint.
    pub fn clear_all(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("removing profile {}", self.path.display())),
        }
    }
}
