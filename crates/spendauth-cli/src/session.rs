//! Session wiring shared by the commands.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::Serialize;
use tracing::{debug, warn};

use spendauth_core::{Claims, SessionPhase, SessionService, SessionStore};
use spendauth_file::FileStorage;
use spendauth_http::{HttpTransport, HttpTransportConfig};

use crate::cli::SessionArgs;

/// Message for commands that need a stored session.
pub const NO_SESSION: &str = "No active session. Run 'spendauth login' first.";

pub type CliService = SessionService<HttpTransport>;

/// Get the directory session records are kept in.
fn data_dir(args: &SessionArgs) -> Result<PathBuf> {
    if let Some(dir) = &args.data_dir {
        return Ok(dir.clone());
    }

    let dirs = ProjectDirs::from("org", "openspending", "spendauth")
        .context("Could not determine data directory")?;
    Ok(dirs.data_dir().to_path_buf())
}

/// Hydrate the stored session and attach an HTTP transport to it.
pub fn open(args: &SessionArgs) -> Result<CliService> {
    let storage = FileStorage::new(data_dir(args)?);
    debug!(dir = %storage.root().display(), key = %args.storage_key, "Opening session");

    let store = SessionStore::hydrate_with_key(Arc::new(storage), &args.storage_key)
        .context("Failed to load session")?;

    let config = HttpTransportConfig::new(&args.base_url)
        .with_timeout(Duration::from_millis(args.timeout_ms));
    let transport = HttpTransport::new(config).context("Failed to create HTTP client")?;

    Ok(SessionService::new(transport, store))
}

/// Summary of the session as printed by `login`, `refresh` and `status`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    pub phase: SessionPhase,
    pub logged_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_expired: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Run the expiry check and summarize the session.
///
/// A token that cannot be decoded is reported rather than treated as fatal.
pub fn report(service: &CliService) -> SessionReport {
    let session = service.session();
    let mut report = SessionReport {
        phase: session.phase(),
        logged_in: session.is_logged_in(),
        is_expired: None,
        expires_at: None,
        error: None,
    };
    if !report.logged_in {
        return report;
    }

    match service.check_is_expired() {
        Ok(is_expired) => report.is_expired = Some(is_expired),
        Err(e) => {
            warn!(error = %e, "Could not check token expiry");
            report.error = Some(format!("Could not check token expiry: {}", e));
        }
    }

    report.expires_at = session
        .current_user()
        .and_then(|credential| Claims::decode(credential.token.as_str()).ok())
        .and_then(|claims| claims.expires_at());

    report
}
