//! Basic fixed-header tar parsing.
//!
//! # Supported format
//! - Each header is one 512-byte block. Only two fields are read: the name
//!   (bytes 0..100, cut at the first NUL) and the size (bytes 124..136,
//!   NUL/space padded ASCII octal).
//! - Content follows the header and is zero-padded to the next block.
//! - A header whose name has no printable bytes ends the archive; anything
//!   after it (usually the two zero blocks) is ignored.
//!
//! # Not supported
//! - PAX extended headers, GNU long names, base-256 sizes, sparse files.
//! - The type flag is not read. Directory, link and metadata headers come
//!   back as ordinary entries carrying whatever content they declare.
//!
//! # Failure modes
//! - A header cut short by the end of the buffer, an unparseable size, a
//!   non-UTF-8 name, or content running past the end of the buffer are all
//!   [`TgzfsError::MalformedArchive`]. Content is never silently truncated.

use bytes::Bytes;
use tracing::trace;

use super::ArchiveEntry;
use crate::error::{Result, TgzfsError};

pub const TAR_BLOCK_LEN: usize = 512;
pub const NAME_LEN: usize = 100;
pub const SIZE_OFFSET: usize = 124;
pub const SIZE_LEN: usize = 12;

/// Parses a NUL/space padded ASCII octal field.
///
/// Returns `None` for an empty field, a non-octal digit (which includes
/// base-256 encodings) or overflow.
pub fn parse_octal(field: &[u8]) -> Option<u64> {
    let trimmed = trim_padding(field);
    if trimmed.is_empty() {
        return None;
    }

    let mut value = 0u64;
    for &c in trimmed {
        if !(b'0'..=b'7').contains(&c) {
            return None;
        }
        value = value.checked_mul(8)?.checked_add(u64::from(c - b'0'))?;
    }
    Some(value)
}

fn trim_padding(field: &[u8]) -> &[u8] {
    let is_pad = |b: &u8| *b == 0 || b.is_ascii_whitespace();
    let start = field.iter().position(|b| !is_pad(b)).unwrap_or(field.len());
    let end = field.iter().rposition(|b| !is_pad(b)).map_or(start, |i| i + 1);
    &field[start..end]
}

/// Name bytes up to (not including) the first NUL.
fn name_bytes(field: &[u8]) -> &[u8] {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    &field[..end]
}

/// True if the name carries nothing printable. Bytes above 0x7f count as
/// printable since they belong to UTF-8 sequences.
fn is_end_marker(name: &[u8]) -> bool {
    !name.iter().any(|&b| b.is_ascii_graphic() || b >= 0x80)
}

#[inline(always)]
fn tar_pad(len: usize) -> usize {
    (TAR_BLOCK_LEN - (len % TAR_BLOCK_LEN)) % TAR_BLOCK_LEN
}

/// Walks a decompressed tar buffer and returns its entries in archive order.
///
/// Content is sliced out of `buf` without copying.
pub fn parse_tar(buf: &Bytes) -> Result<Vec<ArchiveEntry>> {
    let mut entries = Vec::new();
    let mut offset = 0usize;

    while offset < buf.len() {
        let header = &buf[offset..];
        let name = name_bytes(&header[..header.len().min(NAME_LEN)]);
        if is_end_marker(name) {
            trace!(offset, "tar end-of-archive marker");
            break;
        }

        if header.len() < TAR_BLOCK_LEN {
            return Err(TgzfsError::malformed(
                offset,
                format!(
                    "header block truncated: {} of {} bytes",
                    header.len(),
                    TAR_BLOCK_LEN
                ),
            ));
        }

        let path = std::str::from_utf8(name)
            .map_err(|e| TgzfsError::malformed(offset, format!("entry name is not UTF-8: {}", e)))?
            .to_string();

        let size_field = &header[SIZE_OFFSET..SIZE_OFFSET + SIZE_LEN];
        let size = parse_octal(size_field)
            .and_then(|s| usize::try_from(s).ok())
            .ok_or_else(|| {
                TgzfsError::malformed(
                    offset,
                    format!(
                        "invalid size field {:?} for '{}'",
                        String::from_utf8_lossy(size_field),
                        path
                    ),
                )
            })?;

        let start = offset + TAR_BLOCK_LEN;
        let remaining = buf.len() - start;
        if size > remaining {
            return Err(TgzfsError::malformed(
                offset,
                format!(
                    "entry '{}' declares {} bytes but only {} remain",
                    path, size, remaining
                ),
            ));
        }
        let end = start + size;

        trace!(offset, size, path = %path, "tar entry");
        entries.push(ArchiveEntry::new(path, buf.slice(start..end)));

        offset = end + tar_pad(size);
    }

    Ok(entries)
}
