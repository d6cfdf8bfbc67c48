//! dockctl - operator CLI for the dockyard scheduler
//!
//! Talks to the scheduler's HTTP API to manage docks and replay lifecycle
//! events by hand.

use anyhow::Result;
use clap::Parser;

mod client;
mod commands;
mod error;
mod output;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = cli.run().await {
        error::print_error(&e);
        std::process::exit(1);
    }

    Ok(())
}
