//! JWT claim decoding for the expiry check.
//!
//! Only the payload segment is decoded. The signature is not verified: the
//! server does that on every request, the client only needs to know whether
//! sending the token is still worthwhile.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Number, Value};

use crate::error::MalformedCredentialError;

/// The claim set carried in a JWT payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Claims {
    /// Expiry, in seconds since the Unix epoch.
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub exp: i64,

    /// All other claims.
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl Claims {
    /// Decode the claims of a JWT-formatted token.
    pub fn decode(token: &str) -> Result<Self, MalformedCredentialError> {
        let segments: Vec<&str> = token.split('.').collect();
        let [_, payload, _] = segments.as_slice() else {
            return Err(MalformedCredentialError::SegmentCount {
                segments: segments.len(),
            });
        };

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| MalformedCredentialError::Encoding {
                message: e.to_string(),
            })?;

        serde_json::from_slice(&bytes).map_err(|e| MalformedCredentialError::Claims {
            message: e.to_string(),
        })
    }

    /// Returns the expiry as a timestamp, if it is representable.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// Check if the token is expired at `now`. A token is dead from its `exp`
    /// second onwards.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let number = Number::deserialize(deserializer)?;
    number
        .as_i64()
        .or_else(|| {
            number
                .as_f64()
                .filter(|secs| secs.is_finite())
                .map(|secs| secs.floor() as i64)
        })
        .ok_or_else(|| D::Error::custom(format!("exp '{}' is not a timestamp", number)))
}
