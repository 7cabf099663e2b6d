//! spendauth-core - Client-side authentication session state.
//!
//! The crate tracks whether the user holds a live credential, commits every
//! change to that state through a single [`SessionStore`], and mirrors it into
//! a [`SessionStorage`] backend so a restarted client resumes where it left off.
//! Network calls go through an [`AuthTransport`] supplied by the caller.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use spendauth_core::{AuthTransport, LoginCredentials, MemoryStorage, SessionService, SessionStore};
//!
//! # async fn example<T: AuthTransport>(transport: T) -> spendauth_core::Result<()> {
//! let store = SessionStore::hydrate(Arc::new(MemoryStorage::new()))?;
//! let service = SessionService::new(transport, store);
//!
//! service.login(LoginCredentials::new("alice", "secret")).await?;
//! if service.check_is_expired()? {
//!     service.refresh_token().await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod claims;
pub mod credential;
pub mod credentials;
pub mod error;
pub mod memory;
pub mod service;
pub mod state;
pub mod store;
pub mod tokens;
pub mod traits;

#[cfg(test)]
pub(crate) mod test_support;

pub use claims::Claims;
pub use credential::Credential;
pub use credentials::LoginCredentials;
pub use error::{
    Error, InvalidStateError, MalformedCredentialError, StorageError, TransportError,
};
pub use memory::MemoryStorage;
pub use service::SessionService;
pub use state::{Mutation, SessionPhase, SessionState, SessionStatus};
pub use store::{DEFAULT_STORAGE_KEY, SessionHandle, SessionStore};
pub use tokens::{AccessToken, RefreshToken};
pub use traits::{AuthTransport, Method, SessionStorage, TokenResponse};

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
