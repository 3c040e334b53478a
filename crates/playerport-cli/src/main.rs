// playerport entry point.
//
// 1. Parse arguments
// 2. Initialize tracing (log to file, keep stdout for command output)
// 3. Run the subcommand

use std::path::Path;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use playerport_cli::cli::Cli;
use playerport_cli::commands;
use playerport_cli::config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let base_dir = config::resolve_base_dir(cli.config_dir.as_deref());
    init_tracing(&base_dir)?;
    info!("playerport starting: {:?}", cli.command);

    let result = commands::run(cli).await;
    if let Err(e) = &result {
        error!("command failed: {e:#}");
    }
    result
}

fn init_tracing(base_dir: &Path) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = base_dir.join("logs");
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;

    let log_file = std::fs::File::create(log_dir.join("playerport.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("playerport=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
