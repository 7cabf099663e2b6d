//! Output formatting helpers.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use crate::session::SessionReport;

/// Print a success message.
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message.
pub fn warning(msg: &str) {
    eprintln!("{} {}", "!".yellow(), msg);
}

/// Print a labeled field.
pub fn field(label: &str, value: &str) {
    println!("{}: {}", label.dimmed(), value);
}

/// Print a value as compact JSON.
pub fn json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string(value)?;
    println!("{}", json);
    Ok(())
}

/// Print the session summary shared by `login`, `refresh` and `status`.
pub fn report(report: &SessionReport) {
    if !report.logged_in {
        field("Status", "anonymous");
        return;
    }

    field("Status", "logged in");
    let expired = match report.is_expired {
        Some(true) => "yes".red().to_string(),
        Some(false) => "no".green().to_string(),
        None => "unknown".yellow().to_string(),
    };
    field("Expired", &expired);
    if let Some(expires_at) = report.expires_at {
        field("Expires", &expires_at.to_rfc3339());
    }
    if let Some(error) = &report.error {
        warning(error);
    }
}
