//! Tilecast CLI - Command-line interface
//!
//! Lists and exports the stream catalog, probes single URLs and runs playback
//! simulations against the adaptive controller.

mod commands;

use std::path::Path;

use clap::Parser;
use tilecast_core::tracing_setup::{CliLogLevel, init_tracing};

#[derive(Parser)]
#[command(name = "tilecast")]
#[command(about = "An IPTV launcher with adaptive playback")]
struct Cli {
    /// Console log level (`RUST_LOG` overrides it)
    #[arg(long, global = true, value_enum, default_value_t = CliLogLevel::Warn)]
    log_level: CliLogLevel,

    #[command(subcommand)]
    command: commands::Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_tracing_level(), Some(Path::new("logs")))?;

    commands::handle_command(cli.command).await?;

    Ok(())
}
