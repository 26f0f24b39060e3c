//! Run the merge scripts of a planned bundle locally, in parallel.

use anyhow::{Result, bail};
use clap::Parser;
use ntuple_harvester::dispatch;
use std::path::PathBuf;
use tracing::info;

/// Execute the merge scripts created by `merge-plan`.
#[derive(Parser, Debug)]
#[command(name = "run-merging")]
struct Cli {
    /// Worker count for parallel merging
    #[arg(long)]
    parallel: usize,

    /// Bundle directory written by `merge-plan`
    #[arg(long, default_value = "merging")]
    bundle_dir: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();
    let cli = Cli::parse();

    let outcomes = dispatch::run_bundle(&cli.bundle_dir, cli.parallel)?;
    let failed: Vec<&str> = outcomes
        .iter()
        .filter(|o| !o.success)
        .map(|o| o.dataset.as_str())
        .collect();

    info!(
        "ran {} merge scripts, {} failed",
        outcomes.len(),
        failed.len()
    );
    if !failed.is_empty() {
        bail!("merge scripts failed for: {}", failed.join(", "));
    }
    Ok(())
}
