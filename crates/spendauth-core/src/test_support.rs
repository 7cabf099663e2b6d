//! Shared helpers for unit tests.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use serde_json::{Value, json};

use crate::credential::Credential;
use crate::tokens::{AccessToken, RefreshToken};

/// base64url-encode a JSON value as a JWT segment.
pub fn encode_segment(value: &Value) -> String {
    URL_SAFE_NO_PAD.encode(value.to_string())
}

/// Build an HS256-shaped token whose payload carries `exp`.
pub fn jwt_with_exp(exp: i64) -> String {
    format!(
        "eyJhbGciOiJIUzI1NiJ9.{}.sig",
        encode_segment(&json!({ "sub": "alice", "exp": exp }))
    )
}

/// A token that expires an hour from now.
pub fn live_jwt() -> String {
    jwt_with_exp(Utc::now().timestamp() + 3600)
}

/// A token that expired an hour ago.
pub fn expired_jwt() -> String {
    jwt_with_exp(Utc::now().timestamp() - 3600)
}

/// A credential holding `token` and the refresh token `r1`.
pub fn credential(token: &str) -> Credential {
    Credential::new(AccessToken::new(token), Some(RefreshToken::new("r1")))
}
