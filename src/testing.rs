//! Test fixtures shared by the integration suites.

use crate::extract::ExtractionRecord;
use crate::storage::{DirEntry, FakeStorage};
use std::collections::BTreeMap;

/// Register a root directory holding one subdirectory per sample, each
/// containing the given file names.
pub fn sample_tree(storage: &FakeStorage, root: &str, samples: &[(&str, &[&str])]) {
    let children = samples
        .iter()
        .map(|(name, _)| DirEntry::directory(*name))
        .collect();
    storage.add_directory(root, children);

    for (name, files) in samples {
        let entries = files.iter().map(|f| DirEntry::file(*f)).collect();
        storage.add_directory(&format!("{root}/{name}"), entries);
    }
}

/// Build an extraction record from (pipeline, weighted, rows) triples.
#[must_use]
pub fn record(
    pipelines: &[(&str, f64, u64)],
    expected_events: f64,
    expected_pipelines: i64,
) -> ExtractionRecord {
    let mut names: Vec<String> = pipelines.iter().map(|(n, _, _)| (*n).to_string()).collect();
    names.sort();
    ExtractionRecord {
        pipelines: names,
        weighted_counts: pipelines
            .iter()
            .map(|(n, w, _)| ((*n).to_string(), *w))
            .collect(),
        tree_rows: pipelines
            .iter()
            .map(|(n, _, r)| ((*n).to_string(), *r))
            .collect(),
        friends: BTreeMap::new(),
        expected_events,
        expected_pipelines,
    }
}

/// Attach a friend type's per-pipeline row counts to a record.
#[must_use]
pub fn with_friend(
    mut record: ExtractionRecord,
    label: &str,
    rows: &[(&str, u64)],
) -> ExtractionRecord {
    record.friends.insert(
        label.to_string(),
        rows.iter().map(|(n, r)| ((*n).to_string(), *r)).collect(),
    );
    record
}
