//! Four-stage reconciliation of extracted records against expectations.
//!
//! The stages run in order: availability, pipeline count, event counts,
//! friend alignment. A dataset failing one of the first two stages
//! is dropped from everything after it. The event-count stage records
//! failures but keeps the dataset in play for the friend stage: the two
//! checks answer different questions (lost events vs. misaligned friend
//! production), and a dataset can legitimately appear in both reports.

use crate::extract::{ExtractionRecord, RecordStore};
use crate::natsort::sorted_naturally;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Relative deviation above which a count is considered incorrect.
pub const COUNT_TOLERANCE: f64 = 1.0e-4;

/// Friend type produced by the fake-factor reweighting step. It is only
/// filled for tau-related pipelines on simulated samples, so other
/// pipelines are allowed to disagree with the primary row count.
const REWEIGHTING_FRIEND: &str = "FakeFactors";
const TAU_NOMINAL_MARKER: &str = "t_nominal";
const TAU_ENERGY_SCALE_MARKER: &str = "tauEs";
const DATA_RUN_MARKER: &str = "Run201";

/// Outcome of one tolerance comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountComparison {
    Within,
    Mismatch,
    /// The denominator is zero; the ratio is undefined. Guarded here so
    /// it surfaces as a reported mismatch instead of a crash or an
    /// infinite ratio.
    Undefined,
}

/// Compare a found count against an expected count with the standard
/// tolerance. A sentinel or otherwise wrong expectation fails through the
/// ordinary ratio path; only a zero denominator is special-cased.
#[must_use]
pub fn compare_counts(found: f64, expected: f64) -> CountComparison {
    if expected == 0.0 {
        return CountComparison::Undefined;
    }
    if (found / expected - 1.0).abs() > COUNT_TOLERANCE {
        CountComparison::Mismatch
    } else {
        CountComparison::Within
    }
}

fn friend_waived(friend: &str, pipeline: &str, dataset: &str) -> bool {
    friend == REWEIGHTING_FRIEND
        && !pipeline.contains(TAU_NOMINAL_MARKER)
        && !pipeline.contains(TAU_ENERGY_SCALE_MARKER)
        && !dataset.contains(DATA_RUN_MARKER)
}

/// The four categorized result lists, built fresh each run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckReport {
    /// Datasets with no usable source file.
    pub no_files: Vec<String>,
    /// Datasets whose pipeline count disagrees with the pattern table.
    pub wrong_pipeline_counts: Vec<String>,
    /// Dataset → pipelines whose weighted count is out of tolerance.
    pub event_mismatches: BTreeMap<String, Vec<String>>,
    /// Dataset → pipeline → friend types out of alignment.
    pub friend_mismatches: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

/// Run all four reconciliation stages over a record store.
#[must_use]
pub fn run_checks(store: &RecordStore) -> CheckReport {
    let mut report = CheckReport::default();
    let order = sorted_naturally(store.keys());

    info!(target: "harvester::check", "1. step: examining availability of the merged files");
    let mut surviving: Vec<(&String, &ExtractionRecord)> = Vec::new();
    for dataset in &order {
        match store.get(dataset) {
            Some(Some(record)) => surviving.push((dataset, record)),
            _ => {
                warn!(
                    target: "harvester::check",
                    "no correct or too many files found for sample: {dataset}"
                );
                report.no_files.push(dataset.clone());
            }
        }
    }

    info!(target: "harvester::check", "2. step: examining number of pipelines in the merged files");
    surviving.retain(|(dataset, record)| {
        let expected = record.expected_pipelines;
        let found = record.pipelines.len() as i64;
        if expected == found {
            true
        } else {
            warn!(
                target: "harvester::check",
                "incorrect number of pipelines for sample: {dataset} exp = {expected} found = {found}"
            );
            report.wrong_pipeline_counts.push((*dataset).clone());
            false
        }
    });

    info!(
        target: "harvester::check",
        "3. step: examining number of events for each pipeline, deviations > {COUNT_TOLERANCE} considered incorrect"
    );
    for (dataset, record) in &surviving {
        let expected = record.expected_events;
        for pipeline in &record.pipelines {
            let found = record.weighted_counts.get(pipeline).copied().unwrap_or(0.0);
            let flagged = match compare_counts(found, expected) {
                CountComparison::Within => false,
                CountComparison::Mismatch => {
                    warn!(
                        target: "harvester::check",
                        "{dataset}/{pipeline}: incorrect event count, exp = {expected} found = {found}"
                    );
                    true
                }
                CountComparison::Undefined => {
                    warn!(
                        target: "harvester::check",
                        "{dataset}/{pipeline}: expected event count is zero, ratio undefined"
                    );
                    true
                }
            };
            if flagged {
                report
                    .event_mismatches
                    .entry((*dataset).clone())
                    .or_default()
                    .push(pipeline.clone());
            }
        }
    }

    // Event-count failures intentionally do not remove a dataset here.
    info!(
        target: "harvester::check",
        "4. step: examining number of events for each pipeline in the friend files"
    );
    for (dataset, record) in &surviving {
        for pipeline in &record.pipelines {
            let primary = record.tree_rows.get(pipeline).copied().unwrap_or(0);
            for (friend, counts) in &record.friends {
                let found = counts.get(pipeline).copied().unwrap_or(0);
                let comparison = compare_counts(found as f64, primary as f64);
                if comparison == CountComparison::Within {
                    continue;
                }
                if friend_waived(friend, pipeline, dataset) {
                    continue;
                }
                match comparison {
                    CountComparison::Undefined => warn!(
                        target: "harvester::check",
                        "{dataset}/{pipeline}: primary row count is zero, {friend} ratio undefined"
                    ),
                    _ => warn!(
                        target: "harvester::check",
                        "{dataset}/{pipeline}: incorrect {friend} row count, exp = {primary} found = {found}"
                    ),
                }
                report
                    .friend_mismatches
                    .entry((*dataset).clone())
                    .or_default()
                    .entry(pipeline.clone())
                    .or_default()
                    .push(friend.clone());
            }
        }
    }

    report
}
