use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use uuid::Uuid;

use poker_types::Identity;

use crate::profile::ProfileStore;

/// Generate a collision-resistant anonymous id.
///
/// Not cryptographic: a collision only merges two tabs into one
/// identity, it is not a security boundary. The timestamp component
/// keeps ids roughly sortable when debugging.
pub fn generate_anonymous_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix = Uuid::new_v4().simple().to_string();
    format!("anon-{}-{}", millis, &suffix[..8])
}

/// Owns the durable anonymous identity for this device profile.
pub struct IdentityStore {
    store: Arc<ProfileStore>,
}

impl IdentityStore {
    pub fn new(store: Arc<ProfileStore>) -> Self {
        Self { store }
    }

    pub fn get(&self) -> Option<Identity> {
        self.store.load().identity
    }

    /// Returns the stored identity, updating the display name if it
    /// changed; generates and persists a fresh one otherwise. The
    /// anonymous id, once issued, is stable until an explicit `clear`.
    pub fn get_or_create(&self, name: &str) -> Result<Identity> {
        if let Some(mut identity) = self.get() {
            if identity.name != name {
                identity.name = name.to_string();
                self.store.set_identity(&identity)?;
            }
            return Ok(identity);
        }

        let identity = Identity::new(name, generate_anonymous_id());
        self.store.set_identity(&identity)?;
        info!(anonymous_id = %identity.anonymous_id, "created anonymous identity");
        Ok(identity)
    }

    /// Explicit logout: removes the identity and the last-room hint.
    pub fn clear(&self) -> Result<()> {
        self.store.clear_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_store(dir: &tempfile::TempDir) -> IdentityStore {
        IdentityStore::new(Arc::new(ProfileStore::new(dir.path().join("profile.json"))))
    }

    #[test]
    fn test_generated_ids_are_distinct() {
        let a = generate_anonymous_id();
        let b = generate_anonymous_id();
        assert_ne!(a, b);
        assert!(a.starts_with("anon-"));
    }

    #[test]
    fn test_get_or_create_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let store = identity_store(&dir);

        let first = store.get_or_create("Ada").unwrap();
        let second = store.get_or_create("Ada").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_rename_keeps_anonymous_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = identity_store(&dir);

        let first = store.get_or_create("Ada").unwrap();
        let renamed = store.get_or_create("Ada Lovelace").unwrap();
        assert_eq!(first.anonymous_id, renamed.anonymous_id);
        assert_eq!(renamed.name, "Ada Lovelace");
    }

    #[test]
    fn test_clear_forgets_identity() {
        let dir = tempfile::tempdir().unwrap();
        let store = identity_store(&dir);

        let first = store.get_or_create("Ada").unwrap();
        store.clear().unwrap();
        assert!(store.get().is_none());

        let second = store.get_or_create("Ada").unwrap();
        assert_ne!(first.anonymous_id, second.anonymous_id);
    }
}
