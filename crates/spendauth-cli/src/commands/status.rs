//! Status command implementation.

use anyhow::Result;
use clap::Args;

use crate::cli::SessionArgs;
use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Print the status as a JSON object
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: StatusArgs, session_args: &SessionArgs) -> Result<()> {
    let service = session::open(session_args)?;
    let report = session::report(&service);

    if args.json {
        output::json(&report)
    } else {
        output::report(&report);
        Ok(())
    }
}
