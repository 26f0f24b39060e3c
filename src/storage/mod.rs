//! Storage backend abstraction: directory listing and directory creation
//! behind a protocol-agnostic seam.

pub mod fake;
pub mod local;
pub mod shell;
pub mod traits;

pub use fake::FakeStorage;
pub use local::LocalStorage;
pub use shell::{CommandBackend, CommandLister};
pub use traits::{
    DirEntry, DirectoryLister, ErrorKind, StorageBackend, StorageError, StorageResult,
};
