//! The process-wide filesystem primitive table.
//!
//! Code that wants its file access to be interceptable goes through the free
//! functions in this module ([`read_file`], [`read_dir`], [`stat`] and their
//! async forms). Each call dispatches to whatever [`Primitives`] are currently
//! installed: the host filesystem by default, or an overlay while an
//! [`crate::session::InterceptionSession`] is active.
//!
//! Only sessions write to the table. Every reader in the process observes a
//! swap immediately, which is the point of interception and also its hazard.

use std::fmt;
use std::io;
use std::path::Path;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::real::RealFs;
use crate::traits::{AsyncFileSystem, FileSystem};
use crate::types::{Bytes, FileMetadata};

/// A blocking and an async filesystem implementation, installed together.
#[derive(Clone)]
pub struct Primitives {
    blocking: Arc<dyn FileSystem>,
    nonblocking: Arc<dyn AsyncFileSystem>,
}

impl Primitives {
    /// Uses one provider for both the blocking and the async forms.
    pub fn from_provider<P>(provider: Arc<P>) -> Self
    where
        P: FileSystem + AsyncFileSystem + 'static,
    {
        Self {
            blocking: provider.clone(),
            nonblocking: provider,
        }
    }

    /// The host filesystem.
    pub fn real() -> Self {
        Self::from_provider(Arc::new(RealFs::new()))
    }

    pub fn blocking(&self) -> &dyn FileSystem {
        self.blocking.as_ref()
    }

    pub fn nonblocking(&self) -> &dyn AsyncFileSystem {
        self.nonblocking.as_ref()
    }

    /// True if both halves are the very same objects as `other`'s.
    pub fn ptr_eq(&self, other: &Primitives) -> bool {
        // Compare data pointers only; vtable pointers are not guaranteed unique.
        std::ptr::eq(
            Arc::as_ptr(&self.blocking) as *const (),
            Arc::as_ptr(&other.blocking) as *const (),
        ) && std::ptr::eq(
            Arc::as_ptr(&self.nonblocking) as *const (),
            Arc::as_ptr(&other.nonblocking) as *const (),
        )
    }
}

impl fmt::Debug for Primitives {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Primitives")
            .field("blocking", &Arc::as_ptr(&self.blocking))
            .field("nonblocking", &Arc::as_ptr(&self.nonblocking))
            .finish()
    }
}

fn table() -> &'static RwLock<Primitives> {
    static TABLE: OnceLock<RwLock<Primitives>> = OnceLock::new();
    TABLE.get_or_init(|| RwLock::new(Primitives::real()))
}

/// Snapshot of the currently installed primitives.
pub fn installed() -> Primitives {
    table()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Installs `next` and returns what was installed before.
pub(crate) fn swap(next: Primitives) -> Primitives {
    let mut current = table().write().unwrap_or_else(PoisonError::into_inner);
    std::mem::replace(&mut *current, next)
}

/// Reads a whole file through the installed primitives.
pub fn read_file(path: impl AsRef<Path>) -> io::Result<Bytes> {
    installed().blocking().read(path.as_ref())
}

/// Lists a directory through the installed primitives.
pub fn read_dir(path: impl AsRef<Path>) -> io::Result<Vec<String>> {
    installed().blocking().read_dir(path.as_ref())
}

/// Stats a path through the installed primitives.
pub fn stat(path: impl AsRef<Path>) -> io::Result<FileMetadata> {
    installed().blocking().stat(path.as_ref())
}

pub async fn read_file_async(path: impl AsRef<Path>) -> io::Result<Bytes> {
    let primitives = installed();
    primitives.nonblocking().read_async(path.as_ref()).await
}

pub async fn read_dir_async(path: impl AsRef<Path>) -> io::Result<Vec<String>> {
    let primitives = installed();
    primitives.nonblocking().read_dir_async(path.as_ref()).await
}

pub async fn stat_async(path: impl AsRef<Path>) -> io::Result<FileMetadata> {
    let primitives = installed();
    primitives.nonblocking().stat_async(path.as_ref()).await
}

/// Serializes unit tests that touch the process-wide table.
#[cfg(test)]
pub(crate) fn test_lock() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    LOCK.lock().unwrap_or_else(PoisonError::into_inner)
}
