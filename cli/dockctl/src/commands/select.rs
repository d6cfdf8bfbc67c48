//! Host selection command.

use anyhow::Result;
use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::output::{print_single, OutputFormat};

use super::CommandContext;

#[derive(Debug, Clone, Copy, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
enum WorkloadType {
    ContainerRun,
    ContainerBuild,
}

/// Selects a dock and records the assignment against its load.
#[derive(Debug, Args)]
pub struct SelectCommand {
    /// Workload type.
    #[arg(long = "type", value_enum)]
    workload: WorkloadType,

    /// Dock the workload ran on last time.
    #[arg(long)]
    prev_dock: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HintRequest {
    #[serde(rename = "type")]
    workload: WorkloadType,

    #[serde(skip_serializing_if = "Option::is_none")]
    prev_dock: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OptimalHostResponse {
    dock_host: String,
}

impl SelectCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        let client = ctx.client()?;
        let request = HintRequest {
            workload: self.workload,
            prev_dock: self.prev_dock,
        };
        let response: OptimalHostResponse = client.post("/v1/hosts/optimal", &request).await?;

        match ctx.format {
            OutputFormat::Json => print_single(&response),
            OutputFormat::Table => println!("{}", response.dock_host),
        }
        Ok(())
    }
}
