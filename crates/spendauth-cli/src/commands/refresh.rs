//! Refresh command implementation.

use anyhow::{Context, Result, bail};
use clap::Args;
use colored::Colorize;

use crate::cli::SessionArgs;
use crate::output;
use crate::session::{self, NO_SESSION};

#[derive(Args, Debug)]
pub struct RefreshArgs {}

pub async fn run(_args: RefreshArgs, session_args: &SessionArgs) -> Result<()> {
    let service = session::open(session_args)?;
    if !service.session().is_logged_in() {
        bail!(NO_SESSION);
    }

    eprintln!("{}", "Refreshing session...".dimmed());

    service
        .refresh_token()
        .await
        .context("Failed to refresh session")?;

    output::success("Session refreshed successfully");
    println!();
    output::report(&session::report(&service));

    Ok(())
}
