//! Logout command implementation.

use anyhow::{Context, Result};
use clap::Args;

use crate::cli::SessionArgs;
use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct LogoutArgs {}

/// Local only; succeeds whether or not a session was stored.
pub fn run(_args: LogoutArgs, session_args: &SessionArgs) -> Result<()> {
    let service = session::open(session_args)?;
    let was_logged_in = service.session().is_logged_in();

    service.logout().context("Failed to clear session")?;

    if was_logged_in {
        output::success("Logged out");
    } else {
        output::success("No session to clear");
    }
    Ok(())
}
