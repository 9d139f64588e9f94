//! Core traits that define the filesystem primitives tgzfs can intercept.
//!
//! Every filesystem the process talks to through [`crate::primitives`] is
//! expressed as a pair of strategies: a blocking one ([`FileSystem`]) and an
//! async one ([`AsyncFileSystem`]). The real filesystem and the overlay both
//! implement the pair, and the collaborator that wires dependencies decides
//! which implementation is installed.
//!
//! Errors are plain [`std::io::Error`]s so that a path missing from an
//! in-memory map looks exactly like a path missing from disk.

use async_trait::async_trait;
use std::io;
use std::path::Path;
use crate::types::{Bytes, FileMetadata};

/// Blocking read/list/stat primitives.
pub trait FileSystem: Send + Sync {
    /// Reads the entire contents of a file.
    fn read(&self, path: &Path) -> io::Result<Bytes>;

    /// Lists the names (not full paths) of the entries in a directory.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<String>>;

    /// Gets metadata for a file or directory.
    fn stat(&self, path: &Path) -> io::Result<FileMetadata>;
}

/// Non-blocking read/list/stat primitives.
///
/// Implementations must not resolve a call within its first poll when the
/// result is served from memory; callers may rely on the future yielding
/// back to the scheduler before completion.
#[async_trait]
pub trait AsyncFileSystem: Send + Sync {
    /// Reads the entire contents of a file.
    async fn read_async(&self, path: &Path) -> io::Result<Bytes>;

    /// Lists the names (not full paths) of the entries in a directory.
    async fn read_dir_async(&self, path: &Path) -> io::Result<Vec<String>>;

    /// Gets metadata for a file or directory.
    async fn stat_async(&self, path: &Path) -> io::Result<FileMetadata>;
}
