//! Error types for spendauth.
//!
//! Login and refresh failures are normalized into a single human-readable
//! message before they reach the caller; integrity problems (a token that
//! cannot be decoded, an operation that needs a session when there is none)
//! keep their own variants so they can be told apart in diagnostics.

use serde_json::Value;
use thiserror::Error;

/// The unified error type for spendauth operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The token-issuance endpoint refused the login.
    #[error("{message}")]
    AuthenticationRejected { message: String },

    /// The refresh endpoint refused the refresh token.
    #[error("{message}")]
    RefreshRejected { message: String },

    /// The stored token could not be decoded.
    #[error("malformed credential: {0}")]
    MalformedCredential(#[from] MalformedCredentialError),

    /// The operation needs a session state other than the current one.
    #[error("invalid session state: {0}")]
    InvalidState(#[from] InvalidStateError),

    /// The persistence backend failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A generic transport request failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// An operation was attempted in a session state that does not allow it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidStateError {
    /// No credential is held.
    #[error("no active session")]
    NoSession,

    /// The credential carries no refresh token.
    #[error("session has no refresh token")]
    NoRefreshToken,
}

/// The bearer token is not a decodable JWT with an `exp` claim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedCredentialError {
    /// The token is not made of three dot-separated segments.
    #[error("token has {segments} segment(s), expected 3")]
    SegmentCount { segments: usize },

    /// The payload segment is not base64url.
    #[error("token payload is not base64url: {message}")]
    Encoding { message: String },

    /// The payload is not a claim set with a numeric `exp`.
    #[error("token payload is not a valid claim set: {message}")]
    Claims { message: String },
}

/// Persistence backend errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing medium failed.
    #[error("I/O error: {message}")]
    Io { message: String },

    /// The storage key cannot be used by this backend.
    #[error("invalid storage key '{key}'")]
    InvalidKey { key: String },

    /// The session record could not be serialized.
    #[error("serialization failed: {message}")]
    Serialization { message: String },
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io {
            message: err.to_string(),
        }
    }
}

/// Errors reported by an [`AuthTransport`](crate::AuthTransport).
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network connection failed.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Request timed out.
    #[error("request timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// The server answered with a non-success status.
    #[error("{message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Transport-level description of the failure.
        message: String,
        /// Parsed response body, if it was JSON.
        body: Option<Value>,
    },

    /// The server answered with a body that could not be understood.
    #[error("invalid response: {message}")]
    InvalidResponse { message: String },

    /// Generic HTTP error.
    #[error("HTTP error: {message}")]
    Http { message: String },
}

impl TransportError {
    /// Returns the HTTP status code, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the parsed response body, if the server sent one.
    pub fn response_body(&self) -> Option<&Value> {
        match self {
            TransportError::Status { body, .. } => body.as_ref(),
            _ => None,
        }
    }

    /// Returns the transport's own description of the failure.
    pub fn message(&self) -> Option<&str> {
        let message = match self {
            TransportError::Connection { message }
            | TransportError::Status { message, .. }
            | TransportError::InvalidResponse { message }
            | TransportError::Http { message } => message.as_str(),
            TransportError::Timeout { .. } => return None,
        };
        (!message.is_empty()).then_some(message)
    }

    /// Returns the server-provided message stored under `field` in the
    /// response body.
    pub fn server_message(&self, field: &str) -> Option<&str> {
        self.response_body()?
            .get(field)?
            .as_str()
            .filter(|message| !message.is_empty())
    }

    /// Normalize the failure into one message: the server's `field`, then the
    /// transport message, then the rendered error.
    pub fn failure_message(&self, field: &str) -> String {
        self.server_message(field)
            .or_else(|| self.message())
            .map(str::to_string)
            .unwrap_or_else(|| self.to_string())
    }
}
