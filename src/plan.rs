//! Merge planning: destination layout, per-dataset command scripts, and
//! the compressed script bundle.
//!
//! Planning never runs a merge. For every dataset the planner decides the
//! destination path under the resolved output mode, makes sure the
//! destination directory exists through the [`StorageBackend`] seam, and
//! renders the shell commands a downstream runner will execute: a `hadd`
//! invocation over all source files, plus a relay copy (`gfal-copy` or
//! `xrdcp`) when the output mode stages locally first.

use crate::backend::OutputMode;
use crate::group::DatasetGroups;
use crate::natsort::sorted_naturally;
use crate::storage::StorageBackend;
use anyhow::{Context, Result};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

/// Name of the bundle manifest listing one dataset per line.
pub const MANIFEST_NAME: &str = "arguments.txt";

/// Merge destination layout shared by every dataset in one run.
#[derive(Debug, Clone)]
pub struct PlanConfig {
    pub output: OutputMode,
    /// Path up to the user area on the output backend, scheme-free.
    pub output_root: String,
    /// Directory below the root where merged outputs land.
    pub target_dir: String,
}

impl PlanConfig {
    fn relative_dir(&self, dataset: &str) -> String {
        let root = match self.output {
            // Local roots keep their leading slash; remote paths are
            // joined onto an endpoint and must not carry one.
            OutputMode::Local => self.output_root.trim_end_matches('/'),
            _ => self.output_root.trim_matches('/'),
        };
        format!("{}/{}/{}", root, self.target_dir.trim_matches('/'), dataset)
    }
}

/// The rendered merge commands for one dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeScript {
    pub dataset: String,
    /// Final location of the merged artifact.
    pub destination: String,
    pub commands: Vec<String>,
}

impl MergeScript {
    /// Script body as written into the bundle.
    #[must_use]
    pub fn text(&self) -> String {
        let mut text = self.commands.join("\n");
        text.push('\n');
        text
    }
}

fn hadd(destination: &str, sources: &[String]) -> String {
    format!("hadd -f {} {}", destination, sources.join(" "))
}

/// Plan the merge of one dataset group.
///
/// # Errors
///
/// Fails when the destination directory cannot be created on the output
/// backend.
pub fn plan_dataset(
    config: &PlanConfig,
    backend: &dyn StorageBackend,
    dataset: &str,
    sources: &[String],
) -> Result<MergeScript> {
    let rel = config.relative_dir(dataset);
    let merged = format!("{dataset}.root");

    let (directory, destination, commands) = match &config.output {
        OutputMode::Local => {
            let destination = format!("{rel}/{merged}");
            let commands = vec![hadd(&destination, sources)];
            (rel, destination, commands)
        }
        OutputMode::DcapDirect { write, control } => {
            let destination = format!("{write}/{rel}/{merged}");
            let commands = vec![hadd(&destination, sources)];
            (format!("{control}/{rel}"), destination, commands)
        }
        OutputMode::SrmRelay(endpoint) => {
            let destination = format!("{endpoint}/{rel}/{merged}");
            let commands = vec![
                hadd(&merged, sources),
                format!("gfal-copy -f {merged} {destination}"),
            ];
            (format!("{endpoint}/{rel}"), destination, commands)
        }
        OutputMode::XrootdRelay(endpoint) => {
            let destination = format!("{endpoint}/{rel}/{merged}");
            let commands = vec![
                hadd(&merged, sources),
                format!("xrdcp -f {merged} {destination}"),
            ];
            (format!("{endpoint}/{rel}"), destination, commands)
        }
    };

    backend
        .ensure_directory(&directory)
        .with_context(|| format!("creating destination directory {directory}"))?;

    Ok(MergeScript {
        dataset: dataset.to_string(),
        destination,
        commands,
    })
}

/// Plan every dataset group that has at least one source file.
///
/// # Errors
///
/// Propagates destination-directory failures from [`plan_dataset`].
pub fn plan_all(
    config: &PlanConfig,
    backend: &dyn StorageBackend,
    groups: &DatasetGroups,
) -> Result<Vec<MergeScript>> {
    let mut scripts = Vec::new();
    for (dataset, sources) in groups {
        if sources.is_empty() {
            warn!(target: "harvester::plan", "dataset {dataset} has no files, skipping");
            continue;
        }
        info!(
            target: "harvester::plan",
            "dataset {dataset} has files: {}",
            sources.len()
        );
        scripts.push(plan_dataset(config, backend, dataset, sources)?);
    }
    Ok(scripts)
}

/// Write the script bundle: one gzip-compressed script per dataset plus
/// the plain-text manifest, so a runner can dispatch scripts without
/// re-deriving dataset names.
///
/// # Errors
///
/// Fails when the bundle directory or any of its files cannot be written.
pub fn write_bundle(dir: &Path, scripts: &[MergeScript]) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("creating bundle directory {}", dir.display()))?;

    for script in scripts {
        let path = dir.join(format!("{}.sh.gz", script.dataset));
        let file = File::create(&path)
            .with_context(|| format!("creating script {}", path.display()))?;
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder
            .write_all(script.text().as_bytes())
            .with_context(|| format!("writing script {}", path.display()))?;
        encoder
            .finish()
            .with_context(|| format!("finishing script {}", path.display()))?;
    }

    let names = sorted_naturally(scripts.iter().map(|s| s.dataset.as_str()));
    let manifest = dir.join(MANIFEST_NAME);
    fs::write(&manifest, names.join("\n") + "\n")
        .with_context(|| format!("writing manifest {}", manifest.display()))?;

    info!(
        target: "harvester::plan",
        "bundle at {} holds {} scripts",
        dir.display(),
        scripts.len()
    );
    Ok(())
}
