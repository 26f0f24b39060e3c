//! Execute a planned merge bundle: one script per dataset, in parallel
//! workers over disjoint destinations.

use crate::plan::MANIFEST_NAME;
use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use rayon::prelude::*;
use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;
use tracing::{info, warn};

/// Exit state of one dataset's merge script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub dataset: String,
    pub success: bool,
}

/// Dataset names listed in a bundle's manifest.
///
/// # Errors
///
/// Fails when the manifest cannot be read.
pub fn read_manifest(bundle: &Path) -> Result<Vec<String>> {
    let path = bundle.join(MANIFEST_NAME);
    let raw = fs::read_to_string(&path)
        .with_context(|| format!("reading manifest {}", path.display()))?;
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}

fn extract_script(bundle: &Path, scratch: &Path, dataset: &str) -> Result<std::path::PathBuf> {
    let compressed = bundle.join(format!("{dataset}.sh.gz"));
    let script = scratch.join(format!("{dataset}.sh"));
    let file = File::open(&compressed)
        .with_context(|| format!("opening script {}", compressed.display()))?;
    let mut decoder = GzDecoder::new(file);
    let mut out = File::create(&script)
        .with_context(|| format!("creating script {}", script.display()))?;
    io::copy(&mut decoder, &mut out)
        .with_context(|| format!("decompressing {}", compressed.display()))?;
    Ok(script)
}

fn run_script(bundle: &Path, scratch: &Path, dataset: &str) -> DispatchOutcome {
    let success = match extract_script(bundle, scratch, dataset) {
        Ok(script) => match Command::new("sh").arg(&script).status() {
            Ok(status) => status.success(),
            Err(e) => {
                warn!(target: "harvester::dispatch", "{dataset}: cannot run script: {e}");
                false
            }
        },
        Err(e) => {
            warn!(target: "harvester::dispatch", "{dataset}: {e:#}");
            false
        }
    };
    if success {
        info!(target: "harvester::dispatch", "{dataset}: merged");
    } else {
        warn!(target: "harvester::dispatch", "{dataset}: merge script failed");
    }
    DispatchOutcome {
        dataset: dataset.to_string(),
        success,
    }
}

/// Run every script named in the bundle's manifest under a bounded worker
/// pool. Scripts operate on disjoint destinations; completion order is
/// unspecified. A failing script is reported, never fatal.
///
/// # Errors
///
/// Fails when the manifest cannot be read or the worker pool cannot be
/// built; individual script failures are returned in the outcomes.
pub fn run_bundle(bundle: &Path, workers: usize) -> Result<Vec<DispatchOutcome>> {
    let datasets = read_manifest(bundle)?;
    let scratch = TempDir::new().context("creating scratch directory")?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()
        .context("building dispatch worker pool")?;

    let outcomes = pool.install(|| {
        datasets
            .par_iter()
            .map(|dataset| run_script(bundle, scratch.path(), dataset))
            .collect()
    });
    Ok(outcomes)
}
