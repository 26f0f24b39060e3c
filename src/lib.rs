//! # ntuple-harvester
//!
//! Batch **merge planning and post-merge validation** for ntuple
//! production outputs scattered across heterogeneous storage backends.
//!
//! A production campaign leaves each dataset's output split over many
//! small files, on local disk or behind remote protocols (xrootd, srm,
//! dcap). This crate does two coupled jobs:
//!
//! - **Merge planning** - walk one or more input roots, group every
//!   unmerged file by dataset, and emit one backend-appropriate merge
//!   script per dataset (local `hadd`, or `hadd` plus a `gfal-copy` /
//!   `xrdcp` relay step), bundled with a manifest for a parallel runner.
//! - **Validation** - open every merged file, extract per-pipeline event
//!   counts and friend-file row counts, reconcile them against an
//!   external expectation database, and classify each dataset into four
//!   failure categories written as plain-text reports.
//!
//! ## Quick Start
//!
//! ```no_run
//! use ntuple_harvester::*;
//! use regex::Regex;
//! # use anyhow::Result;
//!
//! # fn main() -> Result<()> {
//! // Resolve backend modes from endpoint flags (none set → all local).
//! let (input, output) = backend::resolve(&backend::Endpoints::default())?;
//!
//! // Group unmerged files by dataset across two production directories.
//! let storage = storage::LocalStorage::new();
//! let groups = group::collect_groups(
//!     &storage,
//!     &input,
//!     &["/store/user/jobs_v1".into(), "/store/user/jobs_v2".into()],
//!     &Regex::new(".*")?,
//!     group::FileKind::Ntuple,
//! )?;
//!
//! // Plan the merges and write the script bundle.
//! let config = plan::PlanConfig {
//!     output,
//!     output_root: "/store/user".into(),
//!     target_dir: "merged_v1".into(),
//! };
//! let scripts = plan::plan_all(&config, &storage, &groups)?;
//! plan::write_bundle(std::path::Path::new("merging"), &scripts)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - [`backend`] - endpoint resolution into input/output modes
//! - [`storage`] - directory listing and creation behind a backend seam
//! - [`group`] - dataset discovery and grouping across input roots
//! - [`plan`] - merge script rendering and the compressed bundle
//! - [`ntuple`] - accessor seam for structured output files
//! - [`expect`] - expectation database and pipeline-count table
//! - [`extract`] - per-dataset extraction, optionally in a worker pool
//! - [`check`] - four-stage reconciliation into categorized results
//! - [`report`] - plain-text report emission
//! - [`dispatch`] - parallel execution of a planned bundle
//! - [`natsort`] - natural alphanumeric ordering for dataset names
//! - [`testing`] - fixtures for the integration suites

pub mod backend;
pub mod check;
pub mod dispatch;
pub mod expect;
pub mod extract;
pub mod group;
pub mod natsort;
pub mod ntuple;
pub mod plan;
pub mod report;
pub mod storage;
pub mod testing;

// General re-exports
pub use backend::{Endpoints, InputMode, OutputMode};
pub use check::{CheckReport, CountComparison, compare_counts, run_checks};
pub use expect::{DatasetDatabase, PipelineCounts};
pub use extract::{ExtractionRecord, FriendRoot, RecordStore};
pub use group::{DatasetGroups, FileKind};
pub use natsort::{natural_cmp, sorted_naturally};
pub use plan::{MergeScript, PlanConfig};
pub use storage::{DirEntry, DirectoryLister, StorageBackend};
