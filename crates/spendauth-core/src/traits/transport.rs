//! Authentication transport trait.

use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::credentials::LoginCredentials;
use crate::error::TransportError;
use crate::tokens::{AccessToken, RefreshToken};

/// Success payload from the token-issuance and refresh endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    /// The issued bearer token.
    #[serde(alias = "idToken")]
    pub token: AccessToken,

    /// The refresh token, when the endpoint issues one.
    #[serde(default)]
    pub refresh_token: Option<RefreshToken>,

    /// Everything else in the payload.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// HTTP method for generic transport requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The network collaborator used by [`SessionService`](crate::SessionService).
///
/// Implementations own timeouts, headers and CSRF handling. Failures carry
/// the parsed response body so the service can pull the server's message out.
#[async_trait]
pub trait AuthTransport: Send + Sync {
    /// Exchange a username and password for a token.
    async fn login(&self, credentials: &LoginCredentials) -> Result<TokenResponse, TransportError>;

    /// Exchange a refresh token for a new token.
    async fn refresh(&self, refresh_token: &RefreshToken) -> Result<TokenResponse, TransportError>;

    /// Perform a JSON request, authorized with `token` when one is given.
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        token: Option<&AccessToken>,
    ) -> Result<Value, TransportError>;

    /// Forget anything cached for the current session (headers, CSRF state).
    /// Must not touch the network.
    fn clear_local(&self) {}
}
