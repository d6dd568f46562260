//! tally: reward snapshots for lending markets and their vaults.

use anyhow::bail;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tally_cli::args::{self, Command, USAGE};
use tally_cli::commands;
use tally_cli::config::TallyConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let command = args::parse(&argv)?;

    // Help and diff run without a config file, even a broken one.
    let config = if command.needs_config() {
        TallyConfig::load()?
    } else {
        TallyConfig::default()
    };

    // Logs go to stderr so JSON on stdout stays clean.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.advanced.log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "tally starting");

    match command {
        Command::Snapshot(snapshot) => commands::snapshot::run(&snapshot, &config).await?,
        Command::Check { input, tolerance } => {
            let tolerance = tolerance.unwrap_or_else(|| config.checker.tolerance.clone());
            let summary = commands::check::run(&input, &tolerance)?;
            if !summary.is_consistent() {
                bail!("{} is inconsistent", input.display());
            }
        }
        Command::Diff { from, to, out } => commands::diff::run(&from, &to, out.as_deref())?,
        Command::Help => eprintln!("{USAGE}"),
    }

    Ok(())
}
