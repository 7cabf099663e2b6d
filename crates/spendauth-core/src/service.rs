//! Network-backed session operations.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::Result;
use crate::credential::Credential;
use crate::credentials::LoginCredentials;
use crate::error::{Error, InvalidStateError};
use crate::store::{SessionHandle, SessionStore};
use crate::traits::{AuthTransport, Method};

/// Response field carrying the server's reason for a rejected login.
pub const LOGIN_MESSAGE_FIELD: &str = "message";

/// Response field carrying the server's reason for a rejected refresh.
pub const REFRESH_MESSAGE_FIELD: &str = "errorMessage";

/// Drives login, refresh and logout through an [`AuthTransport`] and commits
/// the outcome to the shared [`SessionStore`].
///
/// Cheap to clone; clones share the transport and the store.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
///
/// use spendauth_core::{AuthTransport, LoginCredentials, MemoryStorage, SessionService, SessionStore};
///
/// # async fn example<T: AuthTransport>(transport: T) -> spendauth_core::Result<()> {
/// let store = SessionStore::hydrate(Arc::new(MemoryStorage::new()))?;
/// let service = SessionService::new(transport, store);
///
/// let credential = service.login(LoginCredentials::new("alice", "secret")).await?;
/// assert!(!credential.is_expired);
/// assert!(service.session().is_logged_in());
/// # Ok(())
/// # }
/// ```
pub struct SessionService<T> {
    transport: Arc<T>,
    session: SessionHandle,
}

impl<T> Clone for SessionService<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            session: self.session.clone(),
        }
    }
}

impl<T: AuthTransport> SessionService<T> {
    /// Create a service owning `transport` and `store`.
    pub fn new(transport: T, store: SessionStore) -> Self {
        Self::from_parts(Arc::new(transport), SessionHandle::new(store))
    }

    /// Create a service over an existing transport and session handle.
    pub fn from_parts(transport: Arc<T>, session: SessionHandle) -> Self {
        Self { transport, session }
    }

    /// Returns the shared session handle.
    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// Returns the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Authenticate and start a session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AuthenticationRejected`] when the transport fails for
    /// any reason, or [`Error::Storage`] when the new session cannot be
    /// stored. The session is anonymous afterwards in both cases.
    #[instrument(skip(self, credentials), fields(username = %credentials.username()))]
    pub async fn login(&self, credentials: LoginCredentials) -> Result<Credential> {
        info!("Logging in");

        match self.transport.login(&credentials).await {
            Ok(response) => {
                let credential = Credential::from(response);
                let committed = self.session.write().login_success(credential.clone());
                if let Err(e) = committed {
                    warn!(error = %e, "Failed to store new session");
                    self.clear_after_failure();
                    return Err(e);
                }
                debug!("Session created successfully");
                Ok(credential)
            }
            Err(err) => {
                let message = err.failure_message(LOGIN_MESSAGE_FIELD);
                warn!(error = %err, status = ?err.status(), "Login rejected");
                self.clear_after_failure();
                Err(Error::AuthenticationRejected { message })
            }
        }
    }

    /// Exchange the stored refresh token for a new bearer token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] without touching the session when there
    /// is no credential or no refresh token, and [`Error::RefreshRejected`]
    /// when the transport fails, or [`Error::Storage`] when the new token
    /// cannot be stored. The session is anonymous afterwards.
    #[instrument(skip(self))]
    pub async fn refresh_token(&self) -> Result<Credential> {
        info!("Refreshing session");

        let refresh_token = {
            let store = self.session.read();
            let credential = store.credential().ok_or(InvalidStateError::NoSession)?;
            credential
                .refresh_token
                .clone()
                .ok_or(InvalidStateError::NoRefreshToken)?
        };

        match self.transport.refresh(&refresh_token).await {
            Ok(response) => {
                let committed = {
                    let mut store = self.session.write();
                    let result = if store.credential().is_some() {
                        store.update_token(response.token)
                    } else {
                        warn!("Session cleared while refreshing, starting a new one");
                        store.login_success(Credential::from(response))
                    };
                    result.map(|()| store.current_user())
                };

                match committed {
                    Ok(Some(credential)) => {
                        debug!("Session refreshed successfully");
                        Ok(credential)
                    }
                    Ok(None) => Err(InvalidStateError::NoSession.into()),
                    Err(e) => {
                        warn!(error = %e, "Failed to store refreshed session");
                        self.clear_after_failure();
                        Err(e)
                    }
                }
            }
            Err(err) => {
                let message = err.failure_message(REFRESH_MESSAGE_FIELD);
                warn!(error = %err, status = ?err.status(), "Refresh rejected");
                self.clear_after_failure();
                Err(Error::RefreshRejected { message })
            }
        }
    }

    /// End the session locally. Never contacts the network.
    #[instrument(skip(self))]
    pub fn logout(&self) -> Result<()> {
        info!("Logging out");
        self.transport.clear_local();
        self.session.write().logout()
    }

    /// Check whether the current token has expired, caching the answer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedCredential`] if the token cannot be decoded.
    pub fn check_is_expired(&self) -> Result<bool> {
        self.session.write().check_is_expired_at(Utc::now())
    }

    /// Perform a JSON request authorized with the current token, if any.
    #[instrument(skip(self, body))]
    pub async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        let token = self
            .session
            .read()
            .credential()
            .map(|credential| credential.token.clone())
            .filter(|token| !token.is_empty());

        Ok(self
            .transport
            .request(method, path, body, token.as_ref())
            .await?)
    }

    fn clear_after_failure(&self) {
        // The in-memory session is cleared even when the record cannot be.
        if let Err(e) = self.session.write().login_failure() {
            warn!(error = %e, "Failed to delete persisted session");
        }
    }
}

impl<T> std::fmt::Debug for SessionService<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionService")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}
