//! Virtual filesystem overlay.
//!
//! Serves read/list/stat for every path at or below `main_directory` from a
//! [`FileMap`] and hands every other path to the wrapped primitives
//! untouched.
//!
//! Directories are not stored. A path is a directory when some key starts
//! with the path followed by `/`; listing a directory yields the distinct
//! first segments after that prefix. This keeps the store a flat map; a tree
//! would only pay off for very deep listings.
//!
//! Intercepted `stat` results are synthetic: all four timestamps are the
//! instant of the query.

use async_trait::async_trait;
use indexmap::IndexSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::debug;

use crate::error::TgzfsError;
use crate::file_map::{normalize_key, FileMap};
use crate::primitives::Primitives;
use crate::traits::{AsyncFileSystem, FileSystem};
use crate::types::{Bytes, FileMetadata};

/// Prefix that every key strictly below `key` starts with.
fn child_prefix(key: &str) -> String {
    if key.ends_with('/') {
        key.to_string()
    } else {
        format!("{}/", key)
    }
}

/// Read-only view of a [`FileMap`] mounted at `main_directory`.
#[derive(Clone)]
pub struct VirtualOverlay {
    main_directory: PathBuf,
    files: Arc<FileMap>,
    delegate: Primitives,
}

impl VirtualOverlay {
    /// Creates an overlay.
    ///
    /// # Arguments
    /// * `main_directory` - Prefix whose paths are served from `files`
    /// * `files` - Shared file contents, keyed by absolute path
    /// * `delegate` - Primitives that receive every path outside the prefix
    pub fn new(main_directory: impl AsRef<Path>, files: Arc<FileMap>, delegate: Primitives) -> Self {
        Self {
            main_directory: main_directory.as_ref().components().collect(),
            files,
            delegate,
        }
    }

    pub fn main_directory(&self) -> &Path {
        &self.main_directory
    }

    pub fn files(&self) -> &Arc<FileMap> {
        &self.files
    }

    /// True iff `path` lies at or below `main_directory`.
    ///
    /// Matching is per component, so `/v` covers `/v/a` but not `/vx`.
    pub fn might_intercept(&self, path: &Path) -> bool {
        path.starts_with(&self.main_directory)
    }

    fn read_intercepted(&self, path: &Path) -> io::Result<Bytes> {
        let key = normalize_key(path);
        debug!(path = %key, "intercepted read");
        match self.files.get(&key) {
            Some(content) => Ok(content.clone()),
            None => Err(TgzfsError::not_found(key).into()),
        }
    }

    fn list_intercepted(&self, path: &Path) -> io::Result<Vec<String>> {
        let key = normalize_key(path);
        debug!(path = %key, "intercepted readdir");
        let prefix = child_prefix(&key);

        let mut children = IndexSet::new();
        for candidate in self.files.paths() {
            if let Some(rest) = candidate.strip_prefix(prefix.as_str()) {
                if let Some(child) = rest.split('/').next().filter(|c| !c.is_empty()) {
                    children.insert(child.to_string());
                }
            }
        }
        Ok(children.into_iter().collect())
    }

    fn stat_intercepted(&self, path: &Path) -> io::Result<FileMetadata> {
        let key = normalize_key(path);
        debug!(path = %key, "intercepted stat");
        let now = SystemTime::now();

        if let Some(content) = self.files.get(&key) {
            return Ok(FileMetadata::synthetic_file(content.len() as u64, now));
        }

        let prefix = child_prefix(&key);
        if self.files.paths().any(|candidate| candidate.starts_with(prefix.as_str())) {
            return Ok(FileMetadata::synthetic_directory(now));
        }

        Err(TgzfsError::not_found(key).into())
    }
}

impl std::fmt::Debug for VirtualOverlay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualOverlay")
            .field("main_directory", &self.main_directory)
            .field("files", &self.files.len())
            .finish()
    }
}

impl FileSystem for VirtualOverlay {
    fn read(&self, path: &Path) -> io::Result<Bytes> {
        if !self.might_intercept(path) {
            return self.delegate.blocking().read(path);
        }
        self.read_intercepted(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<String>> {
        if !self.might_intercept(path) {
            return self.delegate.blocking().read_dir(path);
        }
        self.list_intercepted(path)
    }

    fn stat(&self, path: &Path) -> io::Result<FileMetadata> {
        if !self.might_intercept(path) {
            return self.delegate.blocking().stat(path);
        }
        self.stat_intercepted(path)
    }
}

// In-memory answers are ready immediately; yielding first keeps the result
// out of the first poll, matching what callers expect from real async I/O.
#[async_trait]
impl AsyncFileSystem for VirtualOverlay {
    async fn read_async(&self, path: &Path) -> io::Result<Bytes> {
        if !self.might_intercept(path) {
            return self.delegate.nonblocking().read_async(path).await;
        }
        tokio::task::yield_now().await;
        self.read_intercepted(path)
    }

    async fn read_dir_async(&self, path: &Path) -> io::Result<Vec<String>> {
        if !self.might_intercept(path) {
            return self.delegate.nonblocking().read_dir_async(path).await;
        }
        tokio::task::yield_now().await;
        self.list_intercepted(path)
    }

    async fn stat_async(&self, path: &Path) -> io::Result<FileMetadata> {
        if !self.might_intercept(path) {
            return self.delegate.nonblocking().stat_async(path).await;
        }
        tokio::task::yield_now().await;
        self.stat_intercepted(path)
    }
}
