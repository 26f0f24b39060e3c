//! Plan the merging of unmerged ntuple outputs from local or remote
//! resources into one file per dataset, writing a script bundle for
//! `run-merging`.

use anyhow::{Context, Result, bail};
use clap::Parser;
use ntuple_harvester::backend::{self, Endpoints, InputMode, OutputMode};
use ntuple_harvester::group::{self, FileKind};
use ntuple_harvester::plan::{self, PlanConfig};
use ntuple_harvester::storage::{
    CommandBackend, CommandLister, DirectoryLister, LocalStorage, StorageBackend,
};
use regex::Regex;
use std::path::PathBuf;
use tracing::info;

/// Plan merges of unmerged ntuple outputs from local or remote resources.
#[derive(Parser, Debug)]
#[command(name = "merge-plan")]
struct Cli {
    /// xrootd server to read input files from; unset means local input
    #[arg(long)]
    xrootd_server: Option<String>,

    /// xrootd server for relayed output copies (xrdcp)
    #[arg(long)]
    xrootd_output_server: Option<String>,

    /// srm endpoint for output directory creation and gfal relays
    #[arg(long)]
    srm_server: Option<String>,

    /// dcap endpoint for direct merged-output writes
    #[arg(long)]
    dcap_server: Option<String>,

    /// Directory paths to the unmerged files, from the username on
    #[arg(long, required = true, num_args = 1..)]
    sample_directories: Vec<String>,

    /// Input path on the machine or server up to the user directory
    #[arg(long, default_value = "/pnfs/gridka.de/cms/disk-only/store/user")]
    main_input_directory: String,

    /// Output path on the machine or server up to the user directory
    #[arg(long, default_value = "/pnfs/gridka.de/cms/disk-only/store/user")]
    main_output_directory: String,

    /// Directory below the output path where merged outputs are written
    #[arg(long)]
    target_directory: String,

    /// Regular expression restricting the datasets to plan
    #[arg(long, default_value = ".*")]
    sample_filter: String,

    /// Where to write the script bundle
    #[arg(long, default_value = "merging")]
    bundle_dir: PathBuf,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let endpoints = Endpoints {
        xrootd_in: cli.xrootd_server,
        xrootd_out: cli.xrootd_output_server,
        srm: cli.srm_server,
        dcap: cli.dcap_server,
    };
    let (input, output) = backend::resolve(&endpoints)?;

    let sample_filter =
        Regex::new(&cli.sample_filter).context("invalid --sample-filter expression")?;

    let local = LocalStorage::new();
    let remote_lister;
    let lister: &dyn DirectoryLister = match &input {
        InputMode::Local => &local,
        InputMode::Xrootd(server) => {
            remote_lister = CommandLister::xrootd(server);
            &remote_lister
        }
    };

    let gfal;
    let planner_backend: &dyn StorageBackend = match &output {
        OutputMode::Local => &local,
        _ => {
            gfal = CommandBackend::gfal();
            &gfal
        }
    };

    let roots: Vec<String> = cli
        .sample_directories
        .iter()
        .map(|d| {
            format!(
                "{}/{}",
                cli.main_input_directory.trim_end_matches('/'),
                d.trim_matches('/')
            )
        })
        .collect();

    let groups = group::collect_groups(lister, &input, &roots, &sample_filter, FileKind::Ntuple)?;
    if groups.is_empty() {
        bail!("no datasets matched {:?} under the given roots", cli.sample_filter);
    }

    let config = PlanConfig {
        output,
        output_root: cli.main_output_directory,
        target_dir: cli.target_directory,
    };
    let scripts = plan::plan_all(&config, planner_backend, &groups)?;
    plan::write_bundle(&cli.bundle_dir, &scripts)?;

    info!(
        "planned {} merges into {}",
        scripts.len(),
        cli.bundle_dir.display()
    );
    Ok(())
}
