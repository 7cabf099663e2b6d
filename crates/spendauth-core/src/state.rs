//! Session state and the pure transitions between its values.
//!
//! [`SessionState::apply`] never performs I/O. It returns the next state
//! together with the [`Persist`] effect the caller has to carry out, which
//! keeps the state machine testable without any storage behind it.

use std::fmt;

use serde::Serialize;

use crate::credential::Credential;
use crate::error::InvalidStateError;
use crate::tokens::AccessToken;

/// Coarse session phase. Refresh is a round trip, not a phase of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    Anonymous,
    Authenticated,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::Anonymous => f.write_str("anonymous"),
            SessionPhase::Authenticated => f.write_str("authenticated"),
        }
    }
}

/// Login status flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub logged_in: bool,
}

/// The in-memory session.
///
/// Invariant: `credential.is_none()` implies `!status.logged_in`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionState {
    pub status: SessionStatus,
    pub credential: Option<Credential>,
}

/// A change to the session state.
#[derive(Debug, Clone)]
pub enum Mutation {
    /// A login (or a refresh racing a logout) produced a credential.
    LoginSuccess(Credential),
    /// A refresh replaced the bearer token.
    UpdateToken(AccessToken),
    /// The expiry check cached its result.
    SetExpired(bool),
    /// A login or refresh attempt failed.
    LoginFailure,
    /// The user signed out.
    Logout,
}

impl Mutation {
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::LoginSuccess(_) => "login_success",
            Mutation::UpdateToken(_) => "update_token",
            Mutation::SetExpired(_) => "set_expired",
            Mutation::LoginFailure => "login_failure",
            Mutation::Logout => "logout",
        }
    }
}

/// What has to happen to the persisted record for a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persist {
    /// Write the new state's credential.
    Write,
    /// Delete the record.
    Remove,
    /// Leave the record alone.
    Keep,
}

/// The outcome of applying a [`Mutation`].
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: SessionState,
    pub persist: Persist,
}

impl SessionState {
    /// The state with no session.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// The state holding `credential`.
    pub fn authenticated(credential: Credential) -> Self {
        Self {
            status: SessionStatus { logged_in: true },
            credential: Some(credential),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        if self.status.logged_in {
            SessionPhase::Authenticated
        } else {
            SessionPhase::Anonymous
        }
    }

    /// Compute the state that follows `mutation`.
    pub fn apply(&self, mutation: Mutation) -> Result<Transition, InvalidStateError> {
        match mutation {
            Mutation::LoginSuccess(credential) => {
                let persist = if credential.token.is_empty() {
                    Persist::Keep
                } else {
                    Persist::Write
                };
                Ok(Transition {
                    state: Self::authenticated(credential),
                    persist,
                })
            }
            Mutation::UpdateToken(token) => {
                let mut credential = self.require_credential()?.clone();
                credential.token = token;
                credential.is_expired = false;
                Ok(Transition {
                    state: Self {
                        status: self.status,
                        credential: Some(credential),
                    },
                    persist: Persist::Write,
                })
            }
            Mutation::SetExpired(is_expired) => {
                let mut credential = self.require_credential()?.clone();
                credential.is_expired = is_expired;
                Ok(Transition {
                    state: Self {
                        status: self.status,
                        credential: Some(credential),
                    },
                    persist: Persist::Keep,
                })
            }
            Mutation::LoginFailure | Mutation::Logout => Ok(Transition {
                state: Self::anonymous(),
                persist: Persist::Remove,
            }),
        }
    }

    fn require_credential(&self) -> Result<&Credential, InvalidStateError> {
        self.credential.as_ref().ok_or(InvalidStateError::NoSession)
    }
}
