//! Error handling and display for the CLI.

use colored::Colorize;
use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("API error ({code}): {detail}")]
    Api {
        status: u16,
        code: String,
        detail: String,
        retry_after_seconds: u32,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl CliError {
    pub fn api(
        status: u16,
        code: impl Into<String>,
        detail: impl Into<String>,
        retry_after_seconds: u32,
    ) -> Self {
        Self::Api {
            status,
            code: code.into(),
            detail: detail.into(),
            retry_after_seconds,
        }
    }
}

/// Print an error in a user-friendly format.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {}", "Error:".red().bold(), err);

    if let Some(cli_err) = err.downcast_ref::<CliError>() {
        match cli_err {
            CliError::Api {
                code,
                retry_after_seconds,
                ..
            } if code == "no_docks_available" => {
                eprintln!(
                    "\n{}",
                    format!(
                        "Hint: No dock is registered. Add one with `dockctl docks add`, or retry in {retry_after_seconds}s."
                    )
                    .yellow()
                );
            }
            CliError::Api { status: 503, .. } => {
                eprintln!(
                    "\n{}",
                    "Hint: The scheduler or its shared store is unavailable; retry shortly.".yellow()
                );
            }
            CliError::Network(_) => {
                eprintln!(
                    "\n{}",
                    "Hint: Check that the scheduler is running and --api-url is correct.".yellow()
                );
            }
            _ => {}
        }
    }
}
