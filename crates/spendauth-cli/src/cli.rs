//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use spendauth_core::DEFAULT_STORAGE_KEY;

use crate::commands::{login, logout, refresh, status, whoami};

/// Manage an OpenSpending authentication session.
#[derive(Parser, Debug)]
#[command(name = "spendauth")]
#[command(author, version = env!("SPENDAUTH_VERSION"), about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(flatten)]
    pub session: SessionArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where the session lives and how to reach the server.
#[derive(Args, Debug, Clone)]
pub struct SessionArgs {
    /// Server base URL
    #[arg(
        long,
        env = "SPENDAUTH_BASE_URL",
        default_value = "http://localhost:8000",
        global = true
    )]
    pub base_url: String,

    /// Request timeout in milliseconds
    #[arg(long, env = "SPENDAUTH_TIMEOUT_MS", default_value_t = 5000, global = true)]
    pub timeout_ms: u64,

    /// Directory holding the session record [default: platform data dir]
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Name the session record is stored under
    #[arg(long, default_value = DEFAULT_STORAGE_KEY, global = true)]
    pub storage_key: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in and store the session
    Login(login::LoginArgs),

    /// Exchange the refresh token for a new token
    Refresh(refresh::RefreshArgs),

    /// Forget the stored session
    Logout(logout::LogoutArgs),

    /// Display the stored credential
    Whoami(whoami::WhoamiArgs),

    /// Show whether a session is active and still valid
    Status(status::StatusArgs),
}
