//! The persisted session credential.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::tokens::{AccessToken, RefreshToken};
use crate::traits::TokenResponse;

/// Field names used by records written before the `token`/`isExpired` shape.
const LEGACY_FIELDS: [&str; 2] = ["idToken", "isExpird"];

/// The credential held by an authenticated session.
///
/// Serialized as `{ "token", "refreshToken", "isExpired", ...extra }`. Records
/// written by older clients used `idToken` and `isExpird`; both are still
/// accepted on read but are never written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    /// Bearer token (JWT).
    #[serde(alias = "idToken")]
    pub token: AccessToken,

    /// Token used to obtain a new `token` without the password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<RefreshToken>,

    /// Cached result of the last expiry check. Not maintained between checks.
    #[serde(default, alias = "isExpird")]
    pub is_expired: bool,

    /// Any other fields the server returned with the token.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Credential {
    /// Create a credential that has not been checked for expiry.
    pub fn new(token: AccessToken, refresh_token: Option<RefreshToken>) -> Self {
        Self {
            token,
            refresh_token,
            is_expired: false,
            extra: Map::new(),
        }
    }

    /// Check if a raw JSON record uses the deprecated field names.
    pub fn is_legacy_record(record: &Value) -> bool {
        record
            .as_object()
            .is_some_and(|fields| LEGACY_FIELDS.iter().any(|name| fields.contains_key(*name)))
    }
}

impl From<TokenResponse> for Credential {
    fn from(response: TokenResponse) -> Self {
        let mut extra = response.extra;
        // The liveness flag is ours; a server echoing one would serialize twice.
        for name in ["isExpired", "isExpird"] {
            extra.remove(name);
        }

        Self {
            token: response.token,
            refresh_token: response.refresh_token,
            is_expired: false,
            extra,
        }
    }
}
