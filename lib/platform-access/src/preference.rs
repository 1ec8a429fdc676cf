//! Persisted role preference.
//!
//! The preference is advisory: it records which role the visitor picked on
//! this device and survives reloads, but it is not tied to the identity and
//! never outranks a role asserted by the backend.

use rootcause::prelude::Report;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::StorageError;
use crate::role::Role;
use crate::storage::KeyValueStore;

/// Storage key holding the selected role.
pub const ROLE_PREFERENCE_KEY: &str = "userRole";

/// Reads and writes the visitor's role selection.
#[derive(Clone)]
pub struct RolePreferenceStore {
    store: Arc<dyn KeyValueStore>,
}

impl RolePreferenceStore {
    /// Creates a preference store over the given key/value store.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Loads the stored preference.
    ///
    /// A value that is not a known role is treated as absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store cannot be read.
    pub fn load(&self) -> Result<Option<Role>, Report<StorageError>> {
        let Some(raw) = self.store.get(ROLE_PREFERENCE_KEY)? else {
            return Ok(None);
        };

        match Role::parse(&raw) {
            Ok(role) => Ok(Some(role)),
            Err(e) => {
                warn!(error = %e, "Ignoring unrecognised stored role preference");
                Ok(None)
            }
        }
    }

    /// Stores a preference, overwriting any previous selection.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store cannot be written.
    pub fn store(&self, role: Role) -> Result<(), Report<StorageError>> {
        self.store.set(ROLE_PREFERENCE_KEY, role.as_str())?;
        debug!(role = %role, "Stored role preference");
        Ok(())
    }

    /// Clears the stored preference.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store cannot be written.
    pub fn clear(&self) -> Result<(), Report<StorageError>> {
        self.store.remove(ROLE_PREFERENCE_KEY)?;
        debug!("Cleared role preference");
        Ok(())
    }
}

impl std::fmt::Debug for RolePreferenceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RolePreferenceStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStore, MemoryStore};

    #[test]
    fn empty_store_has_no_preference() {
        let prefs = RolePreferenceStore::new(Arc::new(MemoryStore::new()));
        assert_eq!(prefs.load().unwrap(), None);
    }

    #[test]
    fn store_then_load() {
        let prefs = RolePreferenceStore::new(Arc::new(MemoryStore::new()));
        prefs.store(Role::Vendor).unwrap();
        assert_eq!(prefs.load().unwrap(), Some(Role::Vendor));

        prefs.store(Role::Customer).unwrap();
        assert_eq!(prefs.load().unwrap(), Some(Role::Customer));
    }

    #[test]
    fn clear_removes_preference() {
        let prefs = RolePreferenceStore::new(Arc::new(MemoryStore::new()));
        prefs.store(Role::Admin).unwrap();
        prefs.clear().unwrap();
        assert_eq!(prefs.load().unwrap(), None);
    }

    #[test]
    fn uses_user_role_key_and_wire_name() {
        let store = Arc::new(MemoryStore::new());
        let prefs = RolePreferenceStore::new(store.clone());
        prefs.store(Role::DeliveryPartner).unwrap();
        assert_eq!(
            store.get(ROLE_PREFERENCE_KEY).unwrap().as_deref(),
            Some("delivery_partner")
        );
    }

    #[test]
    fn unknown_stored_value_is_absent() {
        let store = Arc::new(MemoryStore::new());
        store.set(ROLE_PREFERENCE_KEY, "farmer").unwrap();
        let prefs = RolePreferenceStore::new(store);
        assert_eq!(prefs.load().unwrap(), None);
    }

    #[test]
    fn preference_survives_reload_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");

        RolePreferenceStore::new(Arc::new(FileStore::new(&path)))
            .store(Role::DeliveryPartner)
            .unwrap();

        let reloaded = RolePreferenceStore::new(Arc::new(FileStore::new(&path)));
        assert_eq!(reloaded.load().unwrap(), Some(Role::DeliveryPartner));
    }
}
