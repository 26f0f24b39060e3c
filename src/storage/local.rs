//! Plain-filesystem implementation of the storage traits.

use crate::storage::traits::{
    DirEntry, DirectoryLister, ErrorKind, StorageBackend, StorageError, StorageResult,
};
use std::fs;
use std::io;
use std::path::Path;

/// Storage backend over the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStorage;

impl LocalStorage {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn map_io_error(location: &str, err: &io::Error) -> StorageError {
    if err.kind() == io::ErrorKind::NotFound {
        StorageError::not_found(location)
    } else {
        StorageError::new(ErrorKind::Other, format!("{location}: {err}"))
    }
}

impl DirectoryLister for LocalStorage {
    fn list(&self, location: &str) -> StorageResult<Vec<DirEntry>> {
        let read = fs::read_dir(Path::new(location))
            .map_err(|e| map_io_error(location, &e))?;

        let mut entries = Vec::new();
        for entry in read {
            let entry = entry.map_err(|e| map_io_error(location, &e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_directory = entry
                .file_type()
                .map_err(|e| map_io_error(location, &e))?
                .is_dir();
            entries.push(DirEntry { name, is_directory });
        }
        Ok(entries)
    }
}

impl StorageBackend for LocalStorage {
    fn ensure_directory(&self, location: &str) -> StorageResult<()> {
        fs::create_dir_all(Path::new(location)).map_err(|e| map_io_error(location, &e))
    }
}
