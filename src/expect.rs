//! External expectations: the dataset database and the per-sample
//! pipeline-count table.

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Sentinel for a dataset the database does not know; guarantees the
/// event-count check fails rather than silently passing.
pub const UNKNOWN_GENERATED_EVENTS: f64 = -1.0;

/// Sentinel for a sample no count pattern matches; always fails the
/// pipeline-count check.
pub const UNKNOWN_PIPELINE_COUNT: i64 = -1;

/// One dataset's bookkeeping entry. Only the generated-event count is
/// consumed here; other fields in the database file are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetInfo {
    #[serde(rename = "n_events_generated")]
    pub generated_events: f64,
}

/// Read-only dataset database, loaded once per run.
#[derive(Debug, Clone, Default)]
pub struct DatasetDatabase {
    entries: BTreeMap<String, DatasetInfo>,
}

impl DatasetDatabase {
    /// Load the database from a JSON file keyed by dataset name.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading dataset database {}", path.display()))?;
        let entries: BTreeMap<String, DatasetInfo> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing dataset database {}", path.display()))?;
        Ok(Self { entries })
    }

    #[must_use]
    pub fn from_entries(entries: BTreeMap<String, DatasetInfo>) -> Self {
        Self { entries }
    }

    /// Expected generated-event count for `dataset`, or the unknown
    /// sentinel when the database has no entry.
    #[must_use]
    pub fn generated_events(&self, dataset: &str) -> f64 {
        self.entries
            .get(dataset)
            .map_or(UNKNOWN_GENERATED_EVENTS, |e| e.generated_events)
    }
}

/// Ordered (pattern, expected count) pairs; the first pattern found in the
/// dataset name wins, so more specific patterns must come first.
#[derive(Debug, Clone)]
pub struct PipelineCounts {
    table: Vec<(Regex, i64)>,
}

impl PipelineCounts {
    /// Build a table from pattern strings in lookup order.
    ///
    /// # Errors
    ///
    /// Fails when a pattern does not compile.
    pub fn new<S: AsRef<str>>(pairs: impl IntoIterator<Item = (S, i64)>) -> Result<Self> {
        let mut table = Vec::new();
        for (pattern, count) in pairs {
            let regex = Regex::new(pattern.as_ref())
                .with_context(|| format!("invalid count pattern {:?}", pattern.as_ref()))?;
            table.push((regex, count));
        }
        Ok(Self { table })
    }

    /// The production table. Tracks the pipeline sets configured per
    /// analysis channel; data-taking samples run a single channel, MC
    /// samples carry the full set of systematic shifts.
    ///
    /// # Panics
    ///
    /// The builtin patterns are known-good; compilation cannot fail.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new([
            ("(SingleMuon|SingleElectron|EGamma|MuonEG).*Run201", 1),
            ("Tau.*Run201", 3),
            ("(Mu|Tau)TauFinalState", 9),
            ("ElTauFinalState", 11),
            ("ElMuFinalState", 3),
            ("DY.?Jets|EWKZ", 184),
            ("ttHJet|HTo(WW|TauTau)|W.?Jets|WG|EWKW", 172),
            ("ST.*top.*|TTTo|TT_|WW_|ZZ_|WZ_", 156),
        ])
        .expect("builtin count patterns compile")
    }

    /// Expected pipeline count for `dataset`: first matching pattern in
    /// table order, or the unknown sentinel.
    #[must_use]
    pub fn expected_for(&self, dataset: &str) -> i64 {
        self.table
            .iter()
            .find(|(regex, _)| regex.is_match(dataset))
            .map_or(UNKNOWN_PIPELINE_COUNT, |(_, count)| *count)
    }
}
