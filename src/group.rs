//! Dataset discovery: walk input roots and group files by sample.
//!
//! Each input root is expected to hold one directory per dataset, each
//! directory holding that dataset's output files. The grouper lists every
//! root through the [`DirectoryLister`] seam, keeps dataset directories
//! whose name matches the sample filter, and accumulates matching files
//! into a dataset → locations map across all roots.

use crate::backend::InputMode;
use crate::storage::{DirectoryLister, ErrorKind, StorageResult};
use anyhow::{Context, Result};
use regex::Regex;
use std::collections::BTreeMap;
use tracing::debug;

/// Dataset name → file locations contributed by all roots.
pub type DatasetGroups = BTreeMap<String, Vec<String>>;

/// Which files inside a dataset directory count as mergeable output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Finished ntuple files (the `.root` binary format).
    Ntuple,
    /// Raw job output: anything that is not a compressed archive.
    RawOutput,
}

impl FileKind {
    #[must_use]
    pub fn accepts(self, name: &str) -> bool {
        match self {
            Self::Ntuple => name.contains(".root"),
            Self::RawOutput => {
                !name.ends_with(".tar.gz") && !name.ends_with(".gz") && !name.ends_with(".zip")
            }
        }
    }
}

fn join(dir: &str, child: &str) -> String {
    format!("{}/{}", dir.trim_end_matches('/'), child)
}

/// Walk `roots` and build the dataset → locations map.
///
/// Directory children of each root whose basename matches `sample_filter`
/// are treated as dataset directories; their file children accepted by
/// `file_kind` become source locations, qualified through `input` so that
/// remote sources carry their server prefix. Multiple roots may contribute
/// files for the same dataset; within one root a listing never repeats a
/// name, so no per-root duplicates can arise.
///
/// # Errors
///
/// A root or dataset directory that cannot be listed aborts the walk; the
/// run has not started any per-dataset work at this point.
pub fn collect_groups(
    lister: &dyn DirectoryLister,
    input: &InputMode,
    roots: &[String],
    sample_filter: &Regex,
    file_kind: FileKind,
) -> Result<DatasetGroups> {
    let mut groups = DatasetGroups::new();

    for root in roots {
        let children = lister
            .list(root)
            .with_context(|| format!("listing input root {root}"))?;

        for child in children {
            if !child.is_directory || !sample_filter.is_match(&child.name) {
                continue;
            }
            let dataset_dir = join(root, &child.name);
            let files = lister
                .list(&dataset_dir)
                .with_context(|| format!("listing dataset directory {dataset_dir}"))?;

            let entry = groups.entry(child.name.clone()).or_default();
            for file in files {
                if !file.is_directory && file_kind.accepts(&file.name) {
                    entry.push(input.qualify(&join(&dataset_dir, &file.name)));
                }
            }
            debug!(
                target: "harvester::group",
                "dataset {} has {} files under {root}",
                child.name,
                entry.len()
            );
        }
    }

    Ok(groups)
}

/// Reduce groups to single sources for the validation job.
///
/// A dataset is usable only when exactly one file was found across all
/// roots; zero or multiple files yield `None`, which downstream stages
/// report as "no files" and exclude from every later check.
#[must_use]
pub fn resolve_single_sources(groups: &DatasetGroups) -> BTreeMap<String, Option<String>> {
    groups
        .iter()
        .map(|(dataset, files)| {
            let single = if files.len() == 1 {
                Some(files[0].clone())
            } else {
                None
            };
            (dataset.clone(), single)
        })
        .collect()
}

/// List the `.root` files directly under `dir`, returning basenames.
///
/// A missing directory is ordinary per-dataset data (no files), not an
/// error; other failures propagate.
pub fn list_ntuple_files(lister: &dyn DirectoryLister, dir: &str) -> StorageResult<Vec<String>> {
    match lister.list(dir) {
        Ok(entries) => Ok(entries
            .into_iter()
            .filter(|e| !e.is_directory && FileKind::Ntuple.accepts(&e.name))
            .map(|e| e.name)
            .collect()),
        Err(e) if e.kind == ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}
