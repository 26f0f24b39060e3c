//! Accessor seam for structured ntuple output files.
//!
//! The binary format reader is an external collaborator; validation only
//! needs the small surface below: open a file, tell whether it was
//! recovered from a truncated write, enumerate its top-level groupings
//! ("pipelines"), and read two kinds of per-grouping numbers: a scalar
//! from a bookkeeping histogram's first bin and the row count of a data
//! table. Absent objects read as zero; open failures and recovered files
//! are reported through [`OpenError`] and [`NtupleFile::is_recovered`] and
//! treated upstream exactly like a missing source file.

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::fmt;
use std::process::Command;
use std::sync::{Arc, Mutex};

/// Bookkeeping histogram holding the weighted event count in its first bin.
pub const BOOKKEEPING_HISTOGRAM: &str = "cutFlowUnweighted";

/// Data table whose row count is the raw (unweighted) event count.
pub const EVENT_TABLE: &str = "ntuple";

/// Failure to open a structured file.
#[derive(Debug, Clone)]
pub struct OpenError {
    pub location: String,
    pub message: String,
}

impl fmt::Display for OpenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot open {}: {}", self.location, self.message)
    }
}

impl Error for OpenError {}

/// One opened structured file.
pub trait NtupleFile {
    /// Whether the file was recovered after a truncated write. Recovered
    /// files carry unreliable contents and are skipped wholesale.
    fn is_recovered(&self) -> bool;

    /// Names of the top-level groupings, unordered.
    fn groupings(&self) -> Vec<String>;

    /// First-bin content of `histogram` under `grouping`; 0.0 when either
    /// is absent.
    fn read_scalar(&self, grouping: &str, histogram: &str) -> f64;

    /// Row count of `table` under `grouping`; 0 when either is absent.
    fn read_row_count(&self, grouping: &str, table: &str) -> u64;
}

/// Opens structured files at backend-qualified locations.
pub trait NtupleSource: Send + Sync {
    /// # Errors
    ///
    /// Returns [`OpenError`] when the file does not exist or cannot be
    /// read as a structured file.
    fn open(&self, location: &str) -> Result<Box<dyn NtupleFile>, OpenError>;
}

// ============================================================================
// Command-backed source
// ============================================================================

/// One grouping's numbers as printed by an external dumper.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupingDump {
    #[serde(default)]
    pub scalars: BTreeMap<String, f64>,
    #[serde(default)]
    pub rows: BTreeMap<String, u64>,
}

/// JSON shape an external dumper prints for one structured file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NtupleDump {
    #[serde(default)]
    pub recovered: bool,
    #[serde(default)]
    pub groupings: BTreeMap<String, GroupingDump>,
}

impl NtupleFile for NtupleDump {
    fn is_recovered(&self) -> bool {
        self.recovered
    }

    fn groupings(&self) -> Vec<String> {
        self.groupings.keys().cloned().collect()
    }

    fn read_scalar(&self, grouping: &str, histogram: &str) -> f64 {
        self.groupings
            .get(grouping)
            .and_then(|g| g.scalars.get(histogram))
            .copied()
            .unwrap_or(0.0)
    }

    fn read_row_count(&self, grouping: &str, table: &str) -> u64 {
        self.groupings
            .get(grouping)
            .and_then(|g| g.rows.get(table))
            .copied()
            .unwrap_or(0)
    }
}

/// Source backed by an external dumper command. The binary-format reader
/// lives outside this crate; the dumper receives the file location as its
/// final argument and prints a [`NtupleDump`] as JSON on stdout.
#[derive(Debug, Clone)]
pub struct CommandNtupleSource {
    program: String,
    args: Vec<String>,
}

impl CommandNtupleSource {
    #[must_use]
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl NtupleSource for CommandNtupleSource {
    fn open(&self, location: &str) -> Result<Box<dyn NtupleFile>, OpenError> {
        let fail = |message: String| OpenError {
            location: location.to_string(),
            message,
        };

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(location)
            .output()
            .map_err(|e| fail(format!("{}: {e}", self.program)))?;
        if !output.status.success() {
            return Err(fail(format!(
                "{} exited with {}",
                self.program, output.status
            )));
        }

        let dump: NtupleDump = serde_json::from_slice(&output.stdout)
            .map_err(|e| fail(format!("unparseable dump: {e}")))?;
        Ok(Box::new(dump))
    }
}

// ============================================================================
// Fake implementation for testing
// ============================================================================

/// In-memory stand-in for one structured file.
#[derive(Debug, Clone, Default)]
pub struct FakeNtuple {
    recovered: bool,
    groupings: Vec<String>,
    scalars: HashMap<(String, String), f64>,
    rows: HashMap<(String, String), u64>,
}

impl FakeNtuple {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A file flagged as recovered from a truncated write.
    #[must_use]
    pub fn recovered() -> Self {
        Self {
            recovered: true,
            ..Self::default()
        }
    }

    /// Add a grouping with no histogram and no table.
    #[must_use]
    pub fn with_grouping(mut self, name: &str) -> Self {
        self.groupings.push(name.to_string());
        self
    }

    #[must_use]
    pub fn with_scalar(mut self, grouping: &str, histogram: &str, value: f64) -> Self {
        self.scalars
            .insert((grouping.to_string(), histogram.to_string()), value);
        self
    }

    #[must_use]
    pub fn with_rows(mut self, grouping: &str, table: &str, rows: u64) -> Self {
        self.rows
            .insert((grouping.to_string(), table.to_string()), rows);
        self
    }

    /// Add a grouping carrying the standard bookkeeping histogram and
    /// event table in one call.
    #[must_use]
    pub fn with_pipeline(self, name: &str, weighted: f64, rows: u64) -> Self {
        self.with_grouping(name)
            .with_scalar(name, BOOKKEEPING_HISTOGRAM, weighted)
            .with_rows(name, EVENT_TABLE, rows)
    }
}

impl NtupleFile for FakeNtuple {
    fn is_recovered(&self) -> bool {
        self.recovered
    }

    fn groupings(&self) -> Vec<String> {
        self.groupings.clone()
    }

    fn read_scalar(&self, grouping: &str, histogram: &str) -> f64 {
        self.scalars
            .get(&(grouping.to_string(), histogram.to_string()))
            .copied()
            .unwrap_or(0.0)
    }

    fn read_row_count(&self, grouping: &str, table: &str) -> u64 {
        self.rows
            .get(&(grouping.to_string(), table.to_string()))
            .copied()
            .unwrap_or(0)
    }
}

/// In-memory source mapping locations to [`FakeNtuple`]s.
#[derive(Clone, Default)]
pub struct FakeNtupleSource {
    files: Arc<Mutex<HashMap<String, FakeNtuple>>>,
}

impl FakeNtupleSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file at `location`.
    ///
    /// # Panics
    ///
    /// Panics if the file-map mutex is poisoned.
    pub fn add_file(&self, location: &str, file: FakeNtuple) {
        self.files
            .lock()
            .expect("file map mutex poisoned")
            .insert(location.to_string(), file);
    }
}

impl NtupleSource for FakeNtupleSource {
    fn open(&self, location: &str) -> Result<Box<dyn NtupleFile>, OpenError> {
        self.files
            .lock()
            .expect("file map mutex poisoned")
            .get(location)
            .cloned()
            .map(|f| Box::new(f) as Box<dyn NtupleFile>)
            .ok_or_else(|| OpenError {
                location: location.to_string(),
                message: "no such file".to_string(),
            })
    }
}
