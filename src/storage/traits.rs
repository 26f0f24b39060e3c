//! Core traits for storage backend operations.
//!
//! Discovery and merge planning only ever need two capabilities from a
//! backend: list the immediate children of a directory, and make sure a
//! directory exists. These traits keep the protocol plumbing (plain
//! filesystem, xrootd, gfal) behind a seam so the grouping and planning
//! logic stays backend-agnostic.

use std::error::Error;
use std::fmt;

// ============================================================================
// Core Error Type
// ============================================================================

/// Generic error type for storage backend operations
#[derive(Debug, Clone)]
pub struct StorageError {
    pub message: String,
    pub kind: ErrorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    BackendUnavailable,
    Other,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for StorageError {}

impl StorageError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    pub fn not_found(location: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, location)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BackendUnavailable, message)
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

// ============================================================================
// Directory Listing
// ============================================================================

/// One immediate child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_directory: bool,
}

impl DirEntry {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_directory: false,
        }
    }

    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_directory: true,
        }
    }
}

/// Trait for listing the immediate children of a directory on a backend.
///
/// A listing never repeats a name; entries carry no ordering guarantee.
pub trait DirectoryLister: Send + Sync {
    /// List the immediate children of `location`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the directory does not exist, or
    /// `BackendUnavailable` if the backend cannot be reached at all.
    fn list(&self, location: &str) -> StorageResult<Vec<DirEntry>>;
}

/// Trait for the merge planner's output-side capability.
pub trait StorageBackend: Send + Sync {
    /// Ensure `location` exists as a directory, creating parents as needed.
    /// Recreating an existing directory is a no-op, not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the backend
    /// cannot be reached.
    fn ensure_directory(&self, location: &str) -> StorageResult<()>;
}
