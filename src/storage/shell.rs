//! Adapters for backends reached through external command-line tools.
//!
//! Remote protocols (xrootd, gfal) ship their own battle-tested clients
//! (`xrdfs`, `gfal-ls`, `gfal-mkdir`); rather than binding their C APIs,
//! these adapters shell out and speak a small line-oriented contract:
//!
//! - listing: the command receives the directory as its final argument and
//!   prints one entry name per line; a trailing `/` marks a directory;
//! - mkdir: the command receives the directory as its final argument and
//!   signals failure through its exit status.
//!
//! Timeouts and retries belong to the external tool's own configuration.

use crate::storage::traits::{
    DirEntry, DirectoryLister, ErrorKind, StorageBackend, StorageError, StorageResult,
};
use std::process::Command;

/// Directory lister backed by an external listing command.
#[derive(Debug, Clone)]
pub struct CommandLister {
    program: String,
    args: Vec<String>,
}

impl CommandLister {
    #[must_use]
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Lister speaking to an xrootd server: `xrdfs <server> ls <dir>`.
    #[must_use]
    pub fn xrootd(server: &str) -> Self {
        Self::new("xrdfs", vec![server.to_string(), "ls".to_string()])
    }
}

impl DirectoryLister for CommandLister {
    fn list(&self, location: &str) -> StorageResult<Vec<DirEntry>> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(location)
            .output()
            .map_err(|e| StorageError::unavailable(format!("{}: {e}", self.program)))?;

        if !output.status.success() {
            return Err(StorageError::new(
                ErrorKind::NotFound,
                format!(
                    "{} exited with {} for {location}",
                    self.program, output.status
                ),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let entries = stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| {
                let is_directory = line.ends_with('/');
                // Tools print full paths; keep only the basename.
                let trimmed = line.trim_end_matches('/');
                let name = trimmed.rsplit('/').next().unwrap_or(trimmed).to_string();
                DirEntry { name, is_directory }
            })
            .collect();
        Ok(entries)
    }
}

/// Output-side backend that creates directories through an external tool,
/// e.g. `gfal-mkdir -p` against an srm endpoint.
#[derive(Debug, Clone)]
pub struct CommandBackend {
    program: String,
    args: Vec<String>,
}

impl CommandBackend {
    #[must_use]
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Backend creating directories via gfal: `gfal-mkdir -p <dir>`.
    #[must_use]
    pub fn gfal() -> Self {
        Self::new("gfal-mkdir", vec!["-p".to_string()])
    }
}

impl StorageBackend for CommandBackend {
    fn ensure_directory(&self, location: &str) -> StorageResult<()> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(location)
            .status()
            .map_err(|e| StorageError::unavailable(format!("{}: {e}", self.program)))?;

        if status.success() {
            Ok(())
        } else {
            Err(StorageError::new(
                ErrorKind::Other,
                format!("{} exited with {status} for {location}", self.program),
            ))
        }
    }
}
