//! CLI commands.

mod docks;
mod events;
mod select;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::client::ApiClient;
use crate::output::OutputFormat;

/// dockctl - inspect and operate the dockyard scheduler.
#[derive(Debug, Parser)]
#[command(name = "dockctl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Scheduler API base URL.
    #[arg(
        long,
        global = true,
        env = "DOCKYARD_API_URL",
        default_value = "http://127.0.0.1:8080"
    )]
    api_url: String,

    /// Output format.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Manage registered docks.
    Docks(docks::DocksCommand),

    /// Ask the scheduler for the optimal dock.
    Select(select::SelectCommand),

    /// Deliver lifecycle events.
    Events(events::EventsCommand),

    /// Show CLI version.
    Version,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let ctx = CommandContext {
            api_url: self.api_url,
            format: self.format,
        };

        match self.command {
            Commands::Docks(cmd) => cmd.run(ctx).await,
            Commands::Select(cmd) => cmd.run(ctx).await,
            Commands::Events(cmd) => cmd.run(ctx).await,
            Commands::Version => {
                println!("dockctl {}", env!("CARGO_PKG_VERSION"));
                Ok(())
            }
        }
    }
}

/// Shared command context.
pub struct CommandContext {
    pub api_url: String,
    pub format: OutputFormat,
}

impl CommandContext {
    pub fn client(&self) -> Result<ApiClient> {
        ApiClient::new(&self.api_url)
    }
}
