//! Per-dataset extraction: read counts out of every merged file, in
//! sequence or across a bounded worker pool.
//!
//! Each dataset's extraction is fully independent (open the primary
//! file, enumerate pipelines, read the per-pipeline numbers, read each
//! friend file), so the batch parallelizes embarrassingly. All records
//! are gathered before reconciliation starts; nothing streams.

use crate::backend::InputMode;
use crate::expect::{DatasetDatabase, PipelineCounts};
use crate::group::list_ntuple_files;
use crate::natsort::sorted_naturally;
use crate::ntuple::{BOOKKEEPING_HISTOGRAM, EVENT_TABLE, NtupleSource};
use crate::storage::DirectoryLister;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Everything measured and looked up for one dataset. Built once during
/// extraction, read-only during reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRecord {
    /// Pipeline names, sorted lexically.
    pub pipelines: Vec<String>,
    /// Pipeline → weighted event count from the bookkeeping histogram.
    pub weighted_counts: BTreeMap<String, f64>,
    /// Pipeline → raw row count of the event table.
    pub tree_rows: BTreeMap<String, u64>,
    /// Friend type → pipeline → raw row count in that friend file.
    pub friends: BTreeMap<String, BTreeMap<String, u64>>,
    /// Generated-event count from the dataset database (−1 when unknown).
    pub expected_events: f64,
    /// Pipeline count from the pattern table (−1 when unmatched).
    pub expected_pipelines: i64,
}

/// Raw extraction results for a whole run. `None` marks a dataset with no
/// usable source: zero or multiple files, an open failure, or a file
/// recovered from a truncated write.
pub type RecordStore = BTreeMap<String, Option<ExtractionRecord>>;

/// One friend-file location: a root directory holding per-dataset
/// subdirectories, labeled by its final path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FriendRoot {
    pub label: String,
    pub dir: String,
}

impl FriendRoot {
    /// Label the root by its last path segment.
    #[must_use]
    pub fn from_path(dir: &str) -> Self {
        let trimmed = dir.trim_end_matches('/');
        let label = trimmed.rsplit('/').next().unwrap_or(trimmed).to_string();
        Self {
            label,
            dir: trimmed.to_string(),
        }
    }
}

/// Collaborators and configuration shared by every dataset's extraction.
pub struct ExtractionContext<'a> {
    pub source: &'a dyn NtupleSource,
    pub lister: &'a dyn DirectoryLister,
    pub input: &'a InputMode,
    pub friend_roots: &'a [FriendRoot],
    pub database: &'a DatasetDatabase,
    pub pipeline_counts: &'a PipelineCounts,
}

/// Execution mode for the extraction batch.
#[derive(Clone, Copy, Debug)]
pub enum ExecMode {
    Sequential,
    Parallel { workers: Option<usize> },
}

fn join(dir: &str, child: &str) -> String {
    format!("{}/{}", dir.trim_end_matches('/'), child)
}

/// Extract one dataset from its single resolved source file.
///
/// Returns `None` when the file cannot be opened or is marked recovered;
/// reconciliation treats that exactly like a missing source.
#[must_use]
pub fn extract_dataset(
    ctx: &ExtractionContext<'_>,
    dataset: &str,
    location: &str,
) -> Option<ExtractionRecord> {
    info!(target: "harvester::extract", "processing {dataset}");

    let file = match ctx.source.open(location) {
        Ok(file) => file,
        Err(e) => {
            warn!(target: "harvester::extract", "{dataset}: {e}");
            return None;
        }
    };
    if file.is_recovered() {
        warn!(target: "harvester::extract", "{dataset}: recovered file, skipping");
        return None;
    }

    let mut pipelines = file.groupings();
    pipelines.sort();

    let mut weighted_counts = BTreeMap::new();
    let mut tree_rows = BTreeMap::new();
    for pipeline in &pipelines {
        weighted_counts.insert(
            pipeline.clone(),
            file.read_scalar(pipeline, BOOKKEEPING_HISTOGRAM),
        );
        tree_rows.insert(pipeline.clone(), file.read_row_count(pipeline, EVENT_TABLE));
    }

    let mut friends = BTreeMap::new();
    for root in ctx.friend_roots {
        friends.insert(
            root.label.clone(),
            read_friend(ctx, root, dataset, &pipelines),
        );
    }

    Some(ExtractionRecord {
        pipelines,
        weighted_counts,
        tree_rows,
        friends,
        expected_events: ctx.database.generated_events(dataset),
        expected_pipelines: ctx.pipeline_counts.expected_for(dataset),
    })
}

/// Read one friend type's per-pipeline row counts. Starts from all-zero
/// counts; files are visited in natural order so that with several files
/// the last one wins deterministically. A friend root with no file for
/// the dataset leaves every count at zero.
fn read_friend(
    ctx: &ExtractionContext<'_>,
    root: &FriendRoot,
    dataset: &str,
    pipelines: &[String],
) -> BTreeMap<String, u64> {
    let mut counts: BTreeMap<String, u64> =
        pipelines.iter().map(|p| (p.clone(), 0)).collect();

    let dataset_dir = join(&root.dir, dataset);
    let files = match list_ntuple_files(ctx.lister, &dataset_dir) {
        Ok(files) => sorted_naturally(files),
        Err(e) => {
            warn!(target: "harvester::extract", "{dataset}: friend {}: {e}", root.label);
            return counts;
        }
    };
    if files.is_empty() {
        debug!(
            target: "harvester::extract",
            "{dataset}: no {} friend file", root.label
        );
        return counts;
    }

    for name in files {
        let location = ctx.input.qualify(&join(&dataset_dir, &name));
        let friend = match ctx.source.open(&location) {
            Ok(friend) => friend,
            Err(e) => {
                warn!(target: "harvester::extract", "{dataset}: friend {}: {e}", root.label);
                continue;
            }
        };
        let present: BTreeSet<String> = friend.groupings().into_iter().collect();
        for pipeline in pipelines {
            let rows = if present.contains(pipeline) {
                friend.read_row_count(pipeline, EVENT_TABLE)
            } else {
                0
            };
            counts.insert(pipeline.clone(), rows);
        }
    }
    counts
}

/// Extract every dataset with a resolved single source; datasets without
/// one go straight into the store as `None`.
///
/// # Errors
///
/// Fails only when the requested worker pool cannot be built; per-dataset
/// problems never abort the batch.
pub fn extract_all(
    ctx: &ExtractionContext<'_>,
    sources: &BTreeMap<String, Option<String>>,
    mode: ExecMode,
) -> Result<RecordStore> {
    let work: Vec<(&str, &str)> = sources
        .iter()
        .filter_map(|(dataset, source)| {
            source.as_deref().map(|loc| (dataset.as_str(), loc))
        })
        .collect();

    let extracted: Vec<(String, Option<ExtractionRecord>)> = match mode {
        ExecMode::Sequential => work
            .iter()
            .map(|(dataset, loc)| ((*dataset).to_string(), extract_dataset(ctx, dataset, loc)))
            .collect(),
        ExecMode::Parallel { workers } => {
            use rayon::prelude::*;
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(workers.unwrap_or_else(num_cpus::get))
                .build()
                .context("building extraction worker pool")?;
            pool.install(|| {
                work.par_iter()
                    .map(|(dataset, loc)| {
                        ((*dataset).to_string(), extract_dataset(ctx, dataset, loc))
                    })
                    .collect()
            })
        }
    };

    let mut store: RecordStore = sources
        .iter()
        .map(|(dataset, _)| (dataset.clone(), None))
        .collect();
    for (dataset, record) in extracted {
        store.insert(dataset, record);
    }
    Ok(store)
}

/// Persist a record store as pretty JSON with sorted keys, consumable by
/// a later run to skip extraction.
///
/// # Errors
///
/// Fails when serialization or the file write fails.
pub fn save_records(path: &Path, store: &RecordStore) -> Result<()> {
    let json = serde_json::to_string_pretty(store).context("serializing record store")?;
    fs::write(path, json)
        .with_context(|| format!("writing record store {}", path.display()))
}

/// Load a previously saved record store.
///
/// # Errors
///
/// Fails when the file cannot be read or parsed.
pub fn load_records(path: &Path) -> Result<RecordStore> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading record store {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("parsing record store {}", path.display()))
}
