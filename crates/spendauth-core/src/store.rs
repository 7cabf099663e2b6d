//! The session store: the single owner of session state.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::Result;
use crate::claims::Claims;
use crate::credential::Credential;
use crate::error::{InvalidStateError, StorageError};
use crate::state::{Mutation, Persist, SessionPhase, SessionState};
use crate::tokens::AccessToken;
use crate::traits::SessionStorage;

/// Storage key holding the serialized session record.
pub const DEFAULT_STORAGE_KEY: &str = "openspending";

/// Owns the session state and keeps the persisted record in step with it.
///
/// Every change goes through [`SessionStore::commit`]. A commit that writes
/// the record only swaps in the new state once the write succeeded; a commit
/// that clears the session drops the in-memory credential first and then
/// deletes the record.
pub struct SessionStore {
    storage: Arc<dyn SessionStorage>,
    key: String,
    state: SessionState,
}

impl SessionStore {
    /// Build the store from whatever is persisted under the default key.
    pub fn hydrate(storage: Arc<dyn SessionStorage>) -> Result<Self> {
        Self::hydrate_with_key(storage, DEFAULT_STORAGE_KEY)
    }

    /// Build the store from whatever is persisted under `key`.
    ///
    /// A record that cannot be parsed is discarded and the store starts
    /// anonymous. A record in the deprecated shape is rewritten.
    #[instrument(skip(storage))]
    pub fn hydrate_with_key(storage: Arc<dyn SessionStorage>, key: &str) -> Result<Self> {
        let key = key.to_string();
        let state = match storage.load(&key)? {
            None => {
                debug!("No persisted session");
                SessionState::anonymous()
            }
            Some(raw) => match Self::parse_record(&raw) {
                Ok((credential, legacy)) => {
                    if legacy {
                        info!("Rewriting session record from deprecated shape");
                        if let Err(e) = Self::serialize(&credential)
                            .and_then(|raw| Ok(storage.save(&key, &raw)?))
                        {
                            warn!(error = %e, "Failed to rewrite session record, keeping it as is");
                        }
                    }
                    debug!("Restored persisted session");
                    SessionState::authenticated(credential)
                }
                Err(e) => {
                    warn!(error = %e, "Discarding unreadable session record");
                    storage.remove(&key)?;
                    SessionState::anonymous()
                }
            },
        };

        Ok(Self {
            storage,
            key,
            state,
        })
    }

    fn parse_record(raw: &str) -> serde_json::Result<(Credential, bool)> {
        let record: Value = serde_json::from_str(raw)?;
        let legacy = Credential::is_legacy_record(&record);
        Ok((serde_json::from_value(record)?, legacy))
    }

    fn serialize(credential: &Credential) -> Result<String> {
        serde_json::to_string(credential).map_err(|e| {
            StorageError::Serialization {
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Apply `mutation` and carry out its persistence effect.
    #[instrument(skip(self, mutation), fields(mutation = mutation.name()))]
    pub fn commit(&mut self, mutation: Mutation) -> Result<()> {
        let transition = self.state.apply(mutation)?;

        match transition.persist {
            Persist::Write => {
                let credential = transition
                    .state
                    .credential
                    .as_ref()
                    .ok_or(InvalidStateError::NoSession)?;
                self.storage.save(&self.key, &Self::serialize(credential)?)?;
                self.state = transition.state;
            }
            Persist::Remove => {
                self.state = transition.state;
                self.storage.remove(&self.key)?;
            }
            Persist::Keep => self.state = transition.state,
        }

        debug!(phase = %self.state.phase(), "Committed");
        Ok(())
    }

    /// Record a successful login.
    pub fn login_success(&mut self, credential: Credential) -> Result<()> {
        self.commit(Mutation::LoginSuccess(credential))
    }

    /// Replace the bearer token after a refresh.
    pub fn update_token(&mut self, token: AccessToken) -> Result<()> {
        self.commit(Mutation::UpdateToken(token))
    }

    /// Cache the result of an expiry check.
    pub fn set_expired(&mut self, is_expired: bool) -> Result<()> {
        self.commit(Mutation::SetExpired(is_expired))
    }

    /// Drop the session after a failed login or refresh.
    pub fn login_failure(&mut self) -> Result<()> {
        self.commit(Mutation::LoginFailure)
    }

    /// Drop the session on sign-out.
    pub fn logout(&mut self) -> Result<()> {
        self.commit(Mutation::Logout)
    }

    /// Check whether the bearer token is past its `exp` claim at `now`.
    ///
    /// An anonymous session is never expired. A cached `true` is returned
    /// without decoding; otherwise the result is decoded and cached.
    pub fn check_is_expired_at(&mut self, now: DateTime<Utc>) -> Result<bool> {
        let Some(credential) = self.state.credential.as_ref() else {
            return Ok(false);
        };
        if credential.is_expired {
            return Ok(true);
        }

        let claims = Claims::decode(credential.token.as_str())?;
        let is_expired = claims.is_expired_at(now);
        debug!(exp = claims.exp, is_expired, "Checked token expiry");

        self.set_expired(is_expired)?;
        Ok(is_expired)
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The storage key this store persists under.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.phase()
    }

    pub fn is_logged_in(&self) -> bool {
        self.state.status.logged_in
    }

    /// The cached expiry flag. `false` without a credential.
    pub fn is_expired(&self) -> bool {
        self.state
            .credential
            .as_ref()
            .is_some_and(|credential| credential.is_expired)
    }

    /// Returns the current credential.
    pub fn current_user(&self) -> Option<Credential> {
        self.state.credential.clone()
    }

    /// Returns the current credential without cloning it.
    pub fn credential(&self) -> Option<&Credential> {
        self.state.credential.as_ref()
    }

    /// The `Authorization` header value for the current token.
    pub fn auth_header(&self) -> Option<String> {
        self.state
            .credential
            .as_ref()
            .filter(|credential| !credential.token.is_empty())
            .map(|credential| format!("Token {}", credential.token.as_str()))
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("key", &self.key)
            .field("state", &self.state)
            .finish()
    }
}

/// A cloneable, shared handle to one [`SessionStore`].
///
/// Commits are synchronous and the lock is never held across an `.await`.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    inner: Arc<RwLock<SessionStore>>,
}

impl SessionHandle {
    pub fn new(store: SessionStore) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    /// Lock the store for queries.
    pub fn read(&self) -> RwLockReadGuard<'_, SessionStore> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock the store for a commit.
    pub fn write(&self) -> RwLockWriteGuard<'_, SessionStore> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_logged_in(&self) -> bool {
        self.read().is_logged_in()
    }

    pub fn is_expired(&self) -> bool {
        self.read().is_expired()
    }

    pub fn current_user(&self) -> Option<Credential> {
        self.read().current_user()
    }

    pub fn phase(&self) -> SessionPhase {
        self.read().phase()
    }

    pub fn auth_header(&self) -> Option<String> {
        self.read().auth_header()
    }
}

impl From<SessionStore> for SessionHandle {
    fn from(store: SessionStore) -> Self {
        Self::new(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::memory::MemoryStorage;
    use crate::test_support::{credential, expired_jwt, live_jwt};
    use chrono::Duration;

    /// Storage whose writes always fail.
    struct ReadOnlyStorage(MemoryStorage);

    impl SessionStorage for ReadOnlyStorage {
        fn load(&self, key: &str) -> std::result::Result<Option<String>, StorageError> {
            self.0.load(key)
        }

        fn save(&self, _key: &str, _value: &str) -> std::result::Result<(), StorageError> {
            Err(StorageError::Io {
                message: "read-only".to_string(),
            })
        }

        fn remove(&self, _key: &str) -> std::result::Result<(), StorageError> {
            Err(StorageError::Io {
                message: "read-only".to_string(),
            })
        }
    }

    fn store() -> (SessionStore, MemoryStorage) {
        let storage = MemoryStorage::new();
        let store = SessionStore::hydrate(Arc::new(storage.clone())).unwrap();
        (store, storage)
    }

    fn persisted(storage: &MemoryStorage) -> Option<Credential> {
        storage
            .get(DEFAULT_STORAGE_KEY)
            .map(|raw| serde_json::from_str(&raw).unwrap())
    }

    #[test]
    fn hydrate_without_record_is_anonymous() {
        let (store, _) = store();
        assert_eq!(store.phase(), SessionPhase::Anonymous);
        assert!(!store.is_logged_in());
        assert!(!store.is_expired());
        assert_eq!(store.current_user(), None);
    }

    #[test]
    fn login_success_persists_credential() {
        let (mut store, storage) = store();
        let credential = credential(&live_jwt());

        store.login_success(credential.clone()).unwrap();

        assert!(store.is_logged_in());
        assert_eq!(store.current_user(), Some(credential.clone()));
        assert_eq!(persisted(&storage), Some(credential));
    }

    #[test]
    fn login_success_with_empty_token_skips_persistence() {
        let (mut store, storage) = store();
        store.login_success(credential("")).unwrap();

        assert!(store.is_logged_in());
        assert!(storage.is_empty());
    }

    #[test]
    fn hydrate_round_trip() {
        let storage = MemoryStorage::new();
        let mut credential = credential(&live_jwt());
        credential
            .extra
            .insert("username".to_string(), serde_json::json!("alice"));

        let mut first = SessionStore::hydrate(Arc::new(storage.clone())).unwrap();
        first.login_success(credential.clone()).unwrap();

        let second = SessionStore::hydrate(Arc::new(storage)).unwrap();
        assert_eq!(second.phase(), SessionPhase::Authenticated);
        assert_eq!(second.current_user(), Some(credential));
    }

    #[test]
    fn hydrate_uses_custom_key() {
        let storage = MemoryStorage::new();
        let mut store =
            SessionStore::hydrate_with_key(Arc::new(storage.clone()), "other").unwrap();
        store.login_success(credential("a.b.c")).unwrap();

        assert_eq!(store.key(), "other");
        assert!(storage.get("other").is_some());
        assert!(storage.get(DEFAULT_STORAGE_KEY).is_none());
    }

    #[test]
    fn hydrate_rewrites_legacy_record() {
        let storage = MemoryStorage::new();
        storage
            .save(
                DEFAULT_STORAGE_KEY,
                r#"{"idToken":"a.b.c","refreshToken":"r1","isExpird":false}"#,
            )
            .unwrap();

        let store = SessionStore::hydrate(Arc::new(storage.clone())).unwrap();
        assert!(store.is_logged_in());

        let raw = storage.get(DEFAULT_STORAGE_KEY).unwrap();
        assert!(raw.contains("\"token\""));
        assert!(!raw.contains("idToken"));
        assert!(!raw.contains("isExpird"));
    }

    #[test]
    fn hydrate_discards_corrupt_record() {
        let storage = MemoryStorage::new();
        storage.save(DEFAULT_STORAGE_KEY, "{not json").unwrap();

        let store = SessionStore::hydrate(Arc::new(storage.clone())).unwrap();
        assert!(!store.is_logged_in());
        assert!(storage.is_empty());
    }

    #[test]
    fn login_failure_and_logout_are_idempotent() {
        let (mut store, storage) = store();
        store.login_success(credential(&live_jwt())).unwrap();

        store.login_failure().unwrap();
        store.login_failure().unwrap();
        assert!(!store.is_logged_in());
        assert_eq!(store.current_user(), None);
        assert!(storage.is_empty());

        store.login_success(credential(&live_jwt())).unwrap();
        store.logout().unwrap();
        store.logout().unwrap();
        assert!(!store.is_logged_in());
        assert_eq!(store.current_user(), None);
        assert!(storage.is_empty());
    }

    #[test]
    fn update_token_and_set_expired_require_session() {
        let (mut store, _) = store();

        let err = store.update_token(AccessToken::new("t")).unwrap_err();
        assert!(matches!(err, Error::InvalidState(InvalidStateError::NoSession)));

        let err = store.set_expired(true).unwrap_err();
        assert!(matches!(err, Error::InvalidState(InvalidStateError::NoSession)));

        assert_eq!(store.phase(), SessionPhase::Anonymous);
    }

    #[test]
    fn update_token_repersists() {
        let (mut store, storage) = store();
        store.login_success(credential("old")).unwrap();
        store.set_expired(true).unwrap();

        store.update_token(AccessToken::new("new")).unwrap();

        let saved = persisted(&storage).unwrap();
        assert_eq!(saved.token.as_str(), "new");
        assert!(!saved.is_expired);
        assert!(!store.is_expired());
    }

    #[test]
    fn failed_write_leaves_state_untouched() {
        let mut store = SessionStore::hydrate(Arc::new(ReadOnlyStorage(MemoryStorage::new()))).unwrap();

        let err = store.login_success(credential("a.b.c")).unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        assert!(!store.is_logged_in());
    }

    #[test]
    fn hydrate_keeps_legacy_record_it_cannot_rewrite() {
        let inner = MemoryStorage::new();
        let legacy = r#"{"idToken":"a.b.c","isExpird":false}"#.to_string();
        inner.save(DEFAULT_STORAGE_KEY, &legacy).unwrap();

        let store = SessionStore::hydrate(Arc::new(ReadOnlyStorage(inner.clone()))).unwrap();

        assert!(store.is_logged_in());
        assert_eq!(store.credential().unwrap().token.as_str(), "a.b.c");
        assert_eq!(inner.get(DEFAULT_STORAGE_KEY), Some(legacy));
    }

    #[test]
    fn failed_remove_still_clears_memory() {
        let inner = MemoryStorage::new();
        inner
            .save(DEFAULT_STORAGE_KEY, &serde_json::to_string(&credential("a.b.c")).unwrap())
            .unwrap();
        let mut store = SessionStore::hydrate(Arc::new(ReadOnlyStorage(inner))).unwrap();
        assert!(store.is_logged_in());

        assert!(store.logout().is_err());
        assert!(!store.is_logged_in());
    }

    #[test]
    fn expired_token_is_detected_and_cached() {
        let (mut store, _) = store();
        store.login_success(credential(&expired_jwt())).unwrap();

        assert!(store.check_is_expired_at(Utc::now()).unwrap());
        assert!(store.is_expired());

        // The cached flag short-circuits, even if the clock went backwards.
        let long_ago = Utc::now() - Duration::days(365);
        assert!(store.check_is_expired_at(long_ago).unwrap());
    }

    #[test]
    fn live_token_is_not_expired() {
        let (mut store, _) = store();
        store.login_success(credential(&live_jwt())).unwrap();

        assert!(!store.check_is_expired_at(Utc::now()).unwrap());
        assert!(!store.is_expired());
    }

    #[test]
    fn anonymous_session_is_never_expired() {
        let (mut store, _) = store();
        assert!(!store.check_is_expired_at(Utc::now()).unwrap());
    }

    #[test]
    fn malformed_token_is_an_error_not_expiry() {
        let (mut store, _) = store();
        store.login_success(credential("opaque-token")).unwrap();

        let err = store.check_is_expired_at(Utc::now()).unwrap_err();
        assert!(matches!(err, Error::MalformedCredential(_)));
        assert!(!store.is_expired());
        assert!(store.is_logged_in());
    }

    #[test]
    fn auth_header_uses_token_scheme() {
        let (mut store, _) = store();
        assert_eq!(store.auth_header(), None);

        store.login_success(credential("a.b.c")).unwrap();
        assert_eq!(store.auth_header().as_deref(), Some("Token a.b.c"));
    }

    #[test]
    fn handle_shares_one_store() {
        let (store, _) = store();
        let handle = SessionHandle::new(store);
        let other = handle.clone();

        handle.write().login_success(credential("a.b.c")).unwrap();
        assert!(other.is_logged_in());
        assert_eq!(other.phase(), SessionPhase::Authenticated);
    }
}
