//! Check merged ntuple files from local or xrootd resources and write the
//! four categorized reports.

use anyhow::{Context, Result};
use clap::Parser;
use ntuple_harvester::backend::{self, Endpoints, InputMode};
use ntuple_harvester::expect::{DatasetDatabase, PipelineCounts};
use ntuple_harvester::extract::{self, ExecMode, ExtractionContext, FriendRoot};
use ntuple_harvester::group::{self, FileKind};
use ntuple_harvester::ntuple::{CommandNtupleSource, NtupleSource};
use ntuple_harvester::storage::{CommandLister, DirectoryLister, LocalStorage};
use ntuple_harvester::{check, report};
use regex::Regex;
use std::path::PathBuf;
use tracing::info;

/// Check merged ntuple files against the dataset database and their
/// friend files.
#[derive(Parser, Debug)]
#[command(name = "check-merged")]
struct Cli {
    /// xrootd server to read merged files from; unset means local input
    #[arg(long)]
    xrootd_server: Option<String>,

    /// Directory holding one subdirectory per merged dataset
    #[arg(long)]
    input_directory: String,

    /// Directories holding friend files, one subdirectory per dataset
    #[arg(long, num_args = 0..)]
    input_friend_directories: Vec<String>,

    /// Dataset database in JSON format
    #[arg(long, default_value = "datasets/datasets.json")]
    database: PathBuf,

    /// Regular expression restricting the datasets to check
    #[arg(long, default_value = ".*")]
    sample_filter: String,

    /// Previously computed record store; skips extraction entirely
    #[arg(long)]
    results: Option<PathBuf>,

    /// External dumper printing a file's counts as JSON
    #[arg(long, default_value = "ntuple-dump")]
    dump_command: String,

    /// Worker count for parallel extraction
    #[arg(long, default_value_t = 5)]
    parallel: usize,

    /// Where to write the record store after extraction
    #[arg(long, default_value = "check_results.json")]
    records_out: PathBuf,

    /// Where to write the four report files
    #[arg(long, default_value = ".")]
    report_dir: PathBuf,
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

    let store = match &cli.results {
        Some(path) => {
            info!("reusing record store {}", path.display());
            extract::load_records(path)?
        }
        None => {
            let endpoints = Endpoints {
                xrootd_in: cli.xrootd_server.clone(),
                ..Endpoints::default()
            };
            let (input, _) = backend::resolve(&endpoints)?;

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

            info!("gathering file listings under {}", cli.input_directory);
            let groups = group::collect_groups(
                lister,
                &input,
                std::slice::from_ref(&cli.input_directory),
                &sample_filter,
                FileKind::Ntuple,
            )?;
            let sources = group::resolve_single_sources(&groups);

            let friend_roots: Vec<FriendRoot> = cli
                .input_friend_directories
                .iter()
                .map(|d| FriendRoot::from_path(d))
                .collect();
            let database = DatasetDatabase::load(&cli.database)?;
            let pipeline_counts = PipelineCounts::builtin();
            let source = CommandNtupleSource::new(cli.dump_command.clone(), Vec::new());

            let ctx = ExtractionContext {
                source: &source as &dyn NtupleSource,
                lister,
                input: &input,
                friend_roots: &friend_roots,
                database: &database,
                pipeline_counts: &pipeline_counts,
            };
            let store = extract::extract_all(
                &ctx,
                &sources,
                ExecMode::Parallel {
                    workers: Some(cli.parallel),
                },
            )?;

            info!("dumping results into {}", cli.records_out.display());
            extract::save_records(&cli.records_out, &store)?;
            store
        }
    };

    let outcome = check::run_checks(&store);
    report::write_reports(&cli.report_dir, &outcome)?;
    info!(
        "checked {} datasets: {} without files, {} with wrong pipeline counts, \
         {} with event mismatches, {} with friend mismatches",
        store.len(),
        outcome.no_files.len(),
        outcome.wrong_pipeline_counts.len(),
        outcome.event_mismatches.len(),
        outcome.friend_mismatches.len()
    );
    Ok(())
}
