//! Dock registry commands.

use std::collections::BTreeMap;

use anyhow::Result;
use clap::{Args, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::client::NO_QUERY;
use crate::output::{print_output, print_single, print_success, OutputFormat};

use super::CommandContext;

#[derive(Debug, Args)]
pub struct DocksCommand {
    #[command(subcommand)]
    command: DocksSubcommand,
}

#[derive(Debug, Subcommand)]
enum DocksSubcommand {
    /// List docks.
    List(ListDocksArgs),

    /// Register a dock. Re-adding keeps its counters.
    Add(AddDockArgs),

    /// Remove a dock.
    Remove(RemoveDockArgs),

    /// Overwrite a load counter.
    Set(SetFieldArgs),
}

#[derive(Debug, Args)]
struct ListDocksArgs {
    /// Only docks carrying this tag.
    #[arg(long, conflicts_with = "raw")]
    tag: Option<String>,

    /// Show every stored record, including incomplete ones.
    #[arg(long)]
    raw: bool,
}

#[derive(Debug, Args)]
struct AddDockArgs {
    /// Dock URL, e.g. http://10.0.0.1:4242.
    host: String,

    /// Comma separated tags.
    #[arg(long)]
    tags: Option<String>,
}

#[derive(Debug, Args)]
struct RemoveDockArgs {
    host: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CounterKey {
    #[value(name = "numBuilds")]
    NumBuilds,
    #[value(name = "numContainers")]
    NumContainers,
}

impl CounterKey {
    fn as_str(self) -> &'static str {
        match self {
            CounterKey::NumBuilds => "numBuilds",
            CounterKey::NumContainers => "numContainers",
        }
    }
}

#[derive(Debug, Args)]
struct SetFieldArgs {
    host: String,

    #[arg(value_enum)]
    key: CounterKey,

    #[arg(allow_negative_numbers = true)]
    value: i64,
}

impl DocksCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        match self.command {
            DocksSubcommand::List(args) if args.raw => list_raw(ctx).await,
            DocksSubcommand::List(args) => list(ctx, args).await,
            DocksSubcommand::Add(args) => add(ctx, args).await,
            DocksSubcommand::Remove(args) => remove(ctx, args).await,
            DocksSubcommand::Set(args) => set(ctx, args).await,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Tabled)]
#[serde(rename_all = "camelCase")]
struct DockRow {
    #[tabled(rename = "Host")]
    host: String,

    #[tabled(rename = "Builds")]
    num_builds: i64,

    #[tabled(rename = "Containers")]
    num_containers: i64,

    #[tabled(rename = "Tags", display = "display_tags")]
    tags: String,
}

fn display_tags(tags: &str) -> String {
    if tags.is_empty() {
        "-".to_string()
    } else {
        tags.to_string()
    }
}

#[derive(Debug, Deserialize)]
struct ListDocksResponse {
    items: Vec<DockRow>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RawDock {
    key: String,
    fields: BTreeMap<String, String>,
}

#[derive(Debug, Serialize, Tabled)]
struct RawDockRow {
    #[tabled(rename = "Key")]
    key: String,

    #[tabled(rename = "Fields")]
    fields: String,
}

#[derive(Debug, Deserialize)]
struct ListRawDocksResponse {
    items: Vec<RawDock>,
}

#[derive(Debug, Deserialize)]
struct DockResponse {
    host: String,
}

async fn list(ctx: CommandContext, args: ListDocksArgs) -> Result<()> {
    let client = ctx.client()?;
    let query: Vec<(&str, &str)> = args.tag.as_deref().map(|t| ("tag", t)).into_iter().collect();
    let response: ListDocksResponse = client.get("/v1/docks", &query).await?;
    print_output(&response.items, ctx.format);
    Ok(())
}

async fn list_raw(ctx: CommandContext) -> Result<()> {
    let client = ctx.client()?;
    let response: ListRawDocksResponse = client.get("/v1/docks/raw", NO_QUERY).await?;

    match ctx.format {
        OutputFormat::Json => print_single(&response.items),
        OutputFormat::Table => {
            let rows: Vec<RawDockRow> = response
                .items
                .into_iter()
                .map(|dock| RawDockRow {
                    key: dock.key,
                    fields: dock
                        .fields
                        .iter()
                        .map(|(k, v)| format!("{k}={v}"))
                        .collect::<Vec<_>>()
                        .join(" "),
                })
                .collect();
            print_output(&rows, ctx.format);
        }
    }
    Ok(())
}

async fn add(ctx: CommandContext, args: AddDockArgs) -> Result<()> {
    let client = ctx.client()?;
    let body = serde_json::json!({ "host": args.host, "tags": args.tags });
    let response: DockResponse = client.post("/v1/docks", &body).await?;

    match ctx.format {
        OutputFormat::Json => print_single(&serde_json::json!({ "host": response.host })),
        OutputFormat::Table => print_success(&format!("Registered dock {}", response.host)),
    }
    Ok(())
}

async fn remove(ctx: CommandContext, args: RemoveDockArgs) -> Result<()> {
    let client = ctx.client()?;
    client.delete("/v1/docks", &[("host", args.host.as_str())]).await?;
    if ctx.format == OutputFormat::Table {
        print_success(&format!("Removed dock {}", args.host));
    }
    Ok(())
}

async fn set(ctx: CommandContext, args: SetFieldArgs) -> Result<()> {
    let client = ctx.client()?;
    let body = serde_json::json!({
        "host": args.host,
        "key": args.key.as_str(),
        "value": args.value,
    });
    client.put("/v1/docks/fields", &body).await?;
    if ctx.format == OutputFormat::Table {
        print_success(&format!(
            "Set {} on {} to {}",
            args.key.as_str(),
            args.host,
            args.value
        ));
    }
    Ok(())
}
