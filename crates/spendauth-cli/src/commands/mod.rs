//! Subcommand implementations.

pub mod login;
pub mod logout;
pub mod refresh;
pub mod status;
pub mod whoami;

use anyhow::Result;

use crate::cli::{Commands, SessionArgs};

pub async fn handle(command: Commands, session: &SessionArgs) -> Result<()> {
    match command {
        Commands::Login(args) => login::run(args, session).await,
        Commands::Refresh(args) => refresh::run(args, session).await,
        Commands::Logout(args) => logout::run(args, session),
        Commands::Whoami(args) => whoami::run(args, session),
        Commands::Status(args) => status::run(args, session),
    }
}
