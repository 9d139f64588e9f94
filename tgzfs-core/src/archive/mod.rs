//! `.tgz` archive decoding.
//!
//! Turns a gzip-compressed tar buffer into an ordered list of
//! [`ArchiveEntry`] values. Decoding is pure: no I/O, no shared state, safe to
//! run in parallel over independent buffers.
//!
//! Only the basic fixed-header tar layout is understood; see [`tar`] for the
//! exact limits.

pub mod builder;
pub mod gzip;
pub mod tar;

pub use builder::TarBuilder;

use bytes::Bytes;
use std::io;
use tracing::debug;

use crate::error::{Result, TgzfsError};

/// A single file extracted from an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Archive-relative, forward-slash separated path
    pub path: String,

    /// File content, shared with the decompressed buffer
    pub content: Bytes,
}

impl ArchiveEntry {
    pub fn new(path: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Decompresses and parses a `.tgz` buffer.
///
/// Entries come back in archive order. Duplicate paths are all returned;
/// resolving them is left to the caller (see [`crate::file_map::FileMap`]).
pub fn decode(bytes: &[u8]) -> Result<Vec<ArchiveEntry>> {
    let raw = gzip::decompress(bytes)?;
    let tar_len = raw.len();
    let entries = tar::parse_tar(&Bytes::from(raw))?;
    debug!(
        compressed = bytes.len(),
        decompressed = tar_len,
        entries = entries.len(),
        "decoded archive"
    );
    Ok(entries)
}

/// Runs [`decode`] on tokio's blocking pool.
pub async fn decode_in_background(bytes: Bytes) -> Result<Vec<ArchiveEntry>> {
    tokio::task::spawn_blocking(move || decode(&bytes))
        .await
        .map_err(|e| TgzfsError::Io {
            source: io::Error::other(e),
        })?
}
