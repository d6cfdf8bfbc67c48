//! Event delivery command.

use anyhow::{anyhow, Context, Result};
use clap::{Args, Subcommand};

use crate::output::{print_single, print_success, print_warning, OutputFormat};

use super::CommandContext;

#[derive(Debug, Args)]
pub struct EventsCommand {
    #[command(subcommand)]
    command: EventsSubcommand,
}

#[derive(Debug, Subcommand)]
enum EventsSubcommand {
    /// Deliver one event and run its handler.
    Emit(EmitArgs),
}

#[derive(Debug, Args)]
struct EmitArgs {
    /// Event name, e.g. dock.up or container.died.
    name: String,

    /// JSON payload.
    #[arg(long, default_value = "{}")]
    payload: String,
}

impl EventsCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        match self.command {
            EventsSubcommand::Emit(args) => emit(ctx, args).await,
        }
    }
}

async fn emit(ctx: CommandContext, args: EmitArgs) -> Result<()> {
    let payload: serde_json::Value =
        serde_json::from_str(&args.payload).context("--payload is not valid JSON")?;

    let client = ctx.client()?;
    let (status, body) = client
        .post_raw(&format!("/v1/events/{}", args.name), &payload)
        .await?;

    if ctx.format == OutputFormat::Json {
        print_single(&body);
    }

    let detail = body["detail"].as_str().unwrap_or("");
    match body["outcome"].as_str() {
        Some("completed") => {
            if ctx.format == OutputFormat::Table {
                print_success(&format!("{} handled", args.name));
            }
            Ok(())
        }
        Some("dropped") => {
            if ctx.format == OutputFormat::Table {
                print_warning(&format!("{} dropped: {detail}", args.name));
            }
            Ok(())
        }
        Some("retry") => Err(anyhow!("{} should be retried: {detail}", args.name)),
        _ => Err(anyhow!("unexpected response ({status}): {body}")),
    }
}
