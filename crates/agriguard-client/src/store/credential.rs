// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Credential store.
//!
//! Persists the current session as `{credential, user, savedAt}` under
//! `<namespace>.session` and re-validates it on every load. Anything that
//! fails validation is removed, so no stale record survives a load.

use std::sync::Arc;
use std::time::Duration;

use agriguard_config::StorageConfig;
use agriguard_core::{Credential, SharedClock, Session, User};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::backend::{SharedStorage, StorageError, StorageResult};

/// Prefix of obscured records.
const RECORD_VERSION: &str = "v1:";

// =============================================================================
// Stored Record
// =============================================================================

/// The persisted session record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSession {
    credential: String,
    user: User,
    saved_at: i64,
}

impl StoredSession {
    fn encode(&self) -> StorageResult<String> {
        let json =
            serde_json::to_vec(self).map_err(|e| StorageError::Serialization(e.to_string()))?;
        Ok(format!("{}{}", RECORD_VERSION, URL_SAFE_NO_PAD.encode(json)))
    }

    fn decode(raw: &str) -> StorageResult<Self> {
        let body = raw
            .strip_prefix(RECORD_VERSION)
            .ok_or_else(|| StorageError::Serialization("unknown record version".to_string()))?;
        let json = URL_SAFE_NO_PAD
            .decode(body.trim())
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        serde_json::from_slice(&json).map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

// =============================================================================
// Load Outcome
// =============================================================================

/// What a read of the stored session found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A valid session.
    Loaded(Session),
    /// No record.
    Absent,
    /// A record that failed validation; it has been cleared.
    Discarded,
    /// The backend could not be read. Says nothing about the session.
    Unavailable,
}

impl LoadOutcome {
    /// The session, if one was loaded.
    pub fn into_session(self) -> Option<Session> {
        match self {
            LoadOutcome::Loaded(session) => Some(session),
            _ => None,
        }
    }

    /// Returns `true` if storage answered, with or without a session.
    pub fn is_conclusive(&self) -> bool {
        !matches!(self, LoadOutcome::Unavailable)
    }
}

// =============================================================================
// CredentialStore
// =============================================================================

/// Durable persistence for the current session.
///
/// Cloning is cheap and clones share the backend.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    backend: SharedStorage,
    namespace: Arc<str>,
    retention: Duration,
    clock: SharedClock,
}

impl CredentialStore {
    /// Creates a store over a backend.
    pub fn new(backend: SharedStorage, namespace: &str, retention: Duration, clock: SharedClock) -> Self {
        Self {
            backend,
            namespace: Arc::from(namespace),
            retention,
            clock,
        }
    }

    /// Creates a store from the storage configuration.
    pub fn from_config(backend: SharedStorage, config: &StorageConfig, clock: SharedClock) -> Self {
        Self::new(backend, &config.namespace, config.retention, clock)
    }

    /// Returns the backend.
    pub fn backend(&self) -> &SharedStorage {
        &self.backend
    }

    /// Returns the key of the session record.
    pub fn session_key(&self) -> String {
        format!("{}.session", self.namespace)
    }

    fn aux_key(&self, name: &str) -> String {
        format!("{}.session.{}", self.namespace, name)
    }

    /// Persists a session.
    ///
    /// Storage failures are logged and swallowed; the return value tells
    /// whether the record was written.
    pub fn save(&self, session: &Session) -> bool {
        let record = StoredSession {
            credential: session.credential().as_str().to_string(),
            user: session.user().clone(),
            saved_at: self.clock.now_millis(),
        };

        let result = record
            .encode()
            .and_then(|encoded| self.backend.set(&self.session_key(), &encoded));

        match result {
            Ok(()) => {
                debug!(user_id = %session.user().id, "Session saved");
                true
            }
            Err(e) => {
                warn!(
                    backend = self.backend.name(),
                    error = %e,
                    "Failed to persist session; continuing in memory"
                );
                false
            }
        }
    }

    /// Loads and re-validates the stored session.
    ///
    /// Returns `None` if the record is absent, unreadable, older than the
    /// retention window, or carries a credential that is malformed, expired
    /// or disagrees with the stored user. See [`CredentialStore::read`] to
    /// tell those cases apart.
    pub fn load(&self) -> Option<Session> {
        self.read().into_session()
    }

    /// Reads and re-validates the stored session.
    ///
    /// A record that fails validation is cleared and reported as
    /// [`LoadOutcome::Discarded`]. A backend error is reported as
    /// [`LoadOutcome::Unavailable`] and leaves storage untouched.
    pub fn read(&self) -> LoadOutcome {
        let raw = match self.backend.get(&self.session_key()) {
            Ok(Some(raw)) => raw,
            Ok(None) => return LoadOutcome::Absent,
            Err(e) => {
                warn!(backend = self.backend.name(), error = %e, "Failed to read stored session");
                return LoadOutcome::Unavailable;
            }
        };

        match self.validate(&raw) {
            Ok(session) => LoadOutcome::Loaded(session),
            Err(reason) => {
                debug!(reason, "Discarding stored session");
                self.clear();
                LoadOutcome::Discarded
            }
        }
    }

    fn validate(&self, raw: &str) -> Result<Session, &'static str> {
        let record = StoredSession::decode(raw).map_err(|_| "unparsable record")?;

        let age_ms = self.clock.now_millis().saturating_sub(record.saved_at);
        let retention_ms = i64::try_from(self.retention.as_millis()).unwrap_or(i64::MAX);
        if age_ms > retention_ms {
            return Err("record older than retention window");
        }

        let credential = Credential::parse(record.credential).map_err(|_| "invalid credential")?;
        if credential.is_expired(self.clock.now_secs()) {
            return Err("credential expired");
        }

        Session::new(credential, record.user).map_err(|_| "credential disagrees with user")
    }

    /// Removes the session record and every `<namespace>.session.*` entry.
    ///
    /// Unrelated keys are left intact. Storage failures are logged and
    /// swallowed.
    pub fn clear(&self) {
        let session_key = self.session_key();
        let aux_prefix = format!("{}.", session_key);

        if let Err(e) = self.backend.remove(&session_key) {
            warn!(backend = self.backend.name(), error = %e, "Failed to clear stored session");
        }

        match self.backend.keys() {
            Ok(keys) => {
                for key in keys.iter().filter(|key| key.starts_with(&aux_prefix)) {
                    if let Err(e) = self.backend.remove(key) {
                        warn!(key = %key, error = %e, "Failed to clear session data");
                    }
                }
            }
            Err(e) => warn!(backend = self.backend.name(), error = %e, "Failed to list storage keys"),
        }
    }

    /// Stores auxiliary data that lives and dies with the session.
    pub fn set_session_data(&self, name: &str, value: &str) {
        if let Err(e) = self.backend.set(&self.aux_key(name), value) {
            warn!(name, error = %e, "Failed to store session data");
        }
    }

    /// Reads auxiliary session data.
    pub fn session_data(&self, name: &str) -> Option<String> {
        match self.backend.get(&self.aux_key(name)) {
            Ok(value) => value,
            Err(e) => {
                warn!(name, error = %e, "Failed to read session data");
                None
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DisabledStorage, MemoryStorage, StorageBackend};
    use agriguard_core::token::encode;
    use agriguard_core::{Claims, ManualClock, Role};

    const NOW: i64 = 1_700_000_000;

    fn fixture() -> (CredentialStore, MemoryStorage, ManualClock) {
        let storage = MemoryStorage::new();
        let clock = ManualClock::at_secs(NOW);
        let store = CredentialStore::new(
            Arc::new(storage.clone()),
            "agriguard",
            Duration::from_secs(24 * 3600),
            Arc::new(clock.clone()),
        );
        (store, storage, clock)
    }

    fn session(role: Role, expires_in: i64) -> Session {
        let claims = Claims::builder("7")
            .email("amina@example.com")
            .role(role)
            .zone("z1")
            .issued_at(NOW)
            .expires_in(expires_in)
            .build();
        let credential = Credential::parse(encode(&claims)).unwrap();
        let user = User::new("7", "Amina", "amina@example.com", role).with_zone("z1");
        Session::new(credential, user).unwrap()
    }

    #[test]
    fn test_save_then_load() {
        let (store, storage, _) = fixture();
        let session = session(Role::ZoneAdmin, 3600);

        store.save(&session);
        let raw = storage.get("agriguard.session").unwrap().unwrap();
        assert!(raw.starts_with("v1:"));
        assert!(!raw.contains("amina"));

        let loaded = store.load().unwrap();
        assert_eq!(loaded.user(), session.user());
        assert_eq!(loaded.credential().as_str(), session.credential().as_str());
    }

    #[test]
    fn test_load_absent() {
        let (store, _, _) = fixture();
        assert!(store.load().is_none());
    }

    #[test]
    fn test_record_older_than_retention_is_cleared() {
        let (store, storage, clock) = fixture();
        store.save(&session(Role::Investor, 48 * 3600));

        clock.advance(Duration::from_secs(25 * 3600));

        assert!(store.load().is_none());
        assert!(storage.get("agriguard.session").unwrap().is_none());
    }

    #[test]
    fn test_expired_credential_is_cleared() {
        let (store, storage, clock) = fixture();
        store.save(&session(Role::Investor, 60));

        clock.advance(Duration::from_secs(60));

        assert!(store.load().is_none());
        assert!(storage.is_empty());
    }

    #[test]
    fn test_garbage_record_is_cleared() {
        let (store, storage, _) = fixture();
        storage.set("agriguard.session", "{\"credential\":").unwrap();

        assert!(store.load().is_none());
        assert!(storage.is_empty());
    }

    #[test]
    fn test_role_mismatch_is_cleared() {
        let (store, storage, _) = fixture();
        let honest = session(Role::Investor, 3600);
        let record = StoredSession {
            credential: honest.credential().as_str().to_string(),
            user: User::new("7", "Amina", "amina@example.com", Role::CentralAdmin),
            saved_at: NOW * 1000,
        };
        storage.set("agriguard.session", &record.encode().unwrap()).unwrap();

        assert!(store.load().is_none());
        assert!(storage.is_empty());
    }

    #[test]
    fn test_clear_removes_session_scoped_entries_only() {
        let (store, storage, _) = fixture();
        store.save(&session(Role::ZoneAdmin, 3600));
        store.set_session_data("last_zone", "z1");
        storage.set("agriguard.preferences", "dark").unwrap();
        storage.set("agriguard.sessionless", "keep").unwrap();

        assert_eq!(store.session_data("last_zone").as_deref(), Some("z1"));

        store.clear();
        store.clear();

        assert!(storage.get("agriguard.session").unwrap().is_none());
        assert!(store.session_data("last_zone").is_none());
        assert_eq!(storage.get("agriguard.preferences").unwrap().as_deref(), Some("dark"));
        assert_eq!(storage.get("agriguard.sessionless").unwrap().as_deref(), Some("keep"));
    }

    #[test]
    fn test_disabled_storage_is_swallowed() {
        let store = CredentialStore::new(
            Arc::new(DisabledStorage),
            "agriguard",
            Duration::from_secs(3600),
            Arc::new(ManualClock::at_secs(NOW)),
        );

        assert!(!store.save(&session(Role::Investor, 3600)));
        store.clear();
        assert_eq!(store.read(), LoadOutcome::Unavailable);
        assert!(store.load().is_none());
        assert!(store.session_data("x").is_none());
    }

    #[test]
    fn test_read_tells_absent_from_discarded() {
        let (store, storage, _) = fixture();
        assert_eq!(store.read(), LoadOutcome::Absent);

        storage.set("agriguard.session", "v1:!!").unwrap();
        assert_eq!(store.read(), LoadOutcome::Discarded);
        assert_eq!(store.read(), LoadOutcome::Absent);

        let saved = session(Role::ZoneAdmin, 3600);
        assert!(store.save(&saved));
        assert_eq!(store.read(), LoadOutcome::Loaded(saved));
    }
}
