//! Login command implementation.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use spendauth_core::LoginCredentials;

use crate::cli::SessionArgs;
use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Account username
    #[arg(long)]
    pub username: String,

    /// Account password
    #[arg(long)]
    pub password: String,
}

pub async fn run(args: LoginArgs, session_args: &SessionArgs) -> Result<()> {
    let service = session::open(session_args)?;
    let credentials = LoginCredentials::new(args.username, args.password);

    eprintln!("{}", "Logging in...".dimmed());

    service.login(credentials).await.context("Login failed")?;

    output::success("Logged in successfully");
    println!();
    output::report(&session::report(&service));

    Ok(())
}
