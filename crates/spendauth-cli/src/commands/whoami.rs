//! Whoami command implementation.

use anyhow::{Context, Result};
use clap::Args;

use spendauth_core::Claims;

use crate::cli::SessionArgs;
use crate::output;
use crate::session::{self, NO_SESSION};

const REDACTED: &str = "[REDACTED]";

/// Server-provided credential fields shown by value. Others are named only.
const DISPLAY_FIELDS: [&str; 4] = ["username", "name", "displayName", "email"];

#[derive(Args, Debug)]
pub struct WhoamiArgs {}

pub fn run(_args: WhoamiArgs, session_args: &SessionArgs) -> Result<()> {
    let service = session::open(session_args)?;
    let credential = service.session().current_user().context(NO_SESSION)?;

    output::field("Storage key", &session_args.storage_key);
    output::field("Token", REDACTED);
    output::field(
        "Refresh token",
        if credential.refresh_token.is_some() {
            REDACTED
        } else {
            "none"
        },
    );

    match Claims::decode(credential.token.as_str()) {
        Ok(claims) => {
            if let Some(subject) = claims.other.get("sub").and_then(|sub| sub.as_str()) {
                output::field("Subject", subject);
            }
            if let Some(expires_at) = claims.expires_at() {
                output::field("Expires", &expires_at.to_rfc3339());
            }
        }
        Err(e) => output::warning(&format!("Token is not a readable JWT: {}", e)),
    }

    let mut hidden = Vec::new();
    for (name, value) in &credential.extra {
        match value {
            serde_json::Value::String(s) if DISPLAY_FIELDS.contains(&name.as_str()) => {
                output::field(name, s);
            }
            _ => hidden.push(name.as_str()),
        }
    }
    if !hidden.is_empty() {
        output::field("Other fields", &hidden.join(", "));
    }

    Ok(())
}
