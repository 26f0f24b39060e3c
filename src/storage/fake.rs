//! Fake storage implementation for testing.
//!
//! An in-memory directory tree that serves listings and records every
//! directory-creation request, making it ideal for unit testing the
//! grouper and planner without touching a real backend.

use crate::storage::traits::{
    DirEntry, DirectoryLister, StorageBackend, StorageError, StorageResult,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

type Tree = Arc<Mutex<HashMap<String, Vec<DirEntry>>>>;

#[derive(Clone, Default)]
pub struct FakeStorage {
    tree: Tree,
    created: Arc<Mutex<Vec<String>>>,
    unavailable: Arc<Mutex<bool>>,
}

impl FakeStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a directory and its immediate children.
    ///
    /// # Panics
    ///
    /// Panics if the tree mutex is poisoned.
    pub fn add_directory(&self, location: &str, entries: Vec<DirEntry>) {
        self.tree
            .lock()
            .expect("tree mutex poisoned")
            .insert(location.to_string(), entries);
    }

    /// Make every operation fail with `BackendUnavailable`.
    ///
    /// # Panics
    ///
    /// Panics if the flag mutex is poisoned.
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().expect("flag mutex poisoned") = unavailable;
    }

    /// Every directory passed to `ensure_directory` so far, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the record mutex is poisoned.
    #[must_use]
    pub fn created_directories(&self) -> Vec<String> {
        self.created.lock().expect("record mutex poisoned").clone()
    }

    fn check_available(&self) -> StorageResult<()> {
        if *self.unavailable.lock().expect("flag mutex poisoned") {
            Err(StorageError::unavailable("fake backend offline"))
        } else {
            Ok(())
        }
    }
}

impl DirectoryLister for FakeStorage {
    fn list(&self, location: &str) -> StorageResult<Vec<DirEntry>> {
        self.check_available()?;
        self.tree
            .lock()
            .expect("tree mutex poisoned")
            .get(location)
            .cloned()
            .ok_or_else(|| StorageError::not_found(location))
    }
}

impl StorageBackend for FakeStorage {
    fn ensure_directory(&self, location: &str) -> StorageResult<()> {
        self.check_available()?;
        self.created
            .lock()
            .expect("record mutex poisoned")
            .push(location.to_string());
        self.tree
            .lock()
            .expect("tree mutex poisoned")
            .entry(location.to_string())
            .or_default();
        Ok(())
    }
}
