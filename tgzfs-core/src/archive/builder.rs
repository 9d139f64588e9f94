//! Minimal ustar writer.
//!
//! Emits regular-file headers with stable metadata (mode 0644, uid/gid 0,
//! mtime 0) so that the output is byte-for-byte deterministic. Names longer
//! than the 100-byte name field are rejected instead of spilling into GNU or
//! PAX records, which the parser does not read.

use super::gzip;
use super::tar::{NAME_LEN, SIZE_LEN, SIZE_OFFSET, TAR_BLOCK_LEN};
use crate::error::{Result, TgzfsError};

const MODE_OFFSET: usize = 100;
const UID_OFFSET: usize = 108;
const GID_OFFSET: usize = 116;
const MTIME_OFFSET: usize = 136;
const CHECKSUM_OFFSET: usize = 148;
const CHECKSUM_LEN: usize = 8;
const TYPEFLAG_OFFSET: usize = 156;
const MAGIC_OFFSET: usize = 257;

/// Largest size an 11-digit octal field can hold.
const MAX_OCTAL_SIZE: u64 = 0o777_7777_7777;

/// Builds a tar archive in memory, one regular file at a time.
#[derive(Debug, Default)]
pub struct TarBuilder {
    out: Vec<u8>,
    entries: usize,
}

impl TarBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a regular file.
    pub fn append(&mut self, path: &str, content: &[u8]) -> Result<&mut Self> {
        if path.is_empty() {
            return Err(TgzfsError::InvalidPath {
                path: path.to_string(),
                reason: "entry name is empty".to_string(),
            });
        }
        if path.len() > NAME_LEN {
            return Err(TgzfsError::InvalidPath {
                path: path.to_string(),
                reason: format!("name exceeds {} bytes", NAME_LEN),
            });
        }
        if path.as_bytes().contains(&0) {
            return Err(TgzfsError::InvalidPath {
                path: path.to_string(),
                reason: "name contains NUL".to_string(),
            });
        }
        if content.len() as u64 > MAX_OCTAL_SIZE {
            return Err(TgzfsError::InvalidPath {
                path: path.to_string(),
                reason: "content too large for the ustar size field".to_string(),
            });
        }

        let mut hdr = [0u8; TAR_BLOCK_LEN];
        hdr[..path.len()].copy_from_slice(path.as_bytes());
        write_field(&mut hdr, MODE_OFFSET, b"0000644\0");
        write_field(&mut hdr, UID_OFFSET, b"0000000\0");
        write_field(&mut hdr, GID_OFFSET, b"0000000\0");
        let size = format!("{:011o}\0", content.len());
        debug_assert_eq!(size.len(), SIZE_LEN);
        write_field(&mut hdr, SIZE_OFFSET, size.as_bytes());
        write_field(&mut hdr, MTIME_OFFSET, b"00000000000\0");
        hdr[TYPEFLAG_OFFSET] = b'0';
        write_field(&mut hdr, MAGIC_OFFSET, b"ustar\x0000");

        // Checksum is computed with its own field filled with spaces.
        hdr[CHECKSUM_OFFSET..CHECKSUM_OFFSET + CHECKSUM_LEN].fill(b' ');
        let sum: u32 = hdr.iter().map(|&b| u32::from(b)).sum();
        let checksum = format!("{:06o}\0 ", sum);
        write_field(&mut hdr, CHECKSUM_OFFSET, checksum.as_bytes());

        self.out.extend_from_slice(&hdr);
        self.out.extend_from_slice(content);
        let pad = (TAR_BLOCK_LEN - content.len() % TAR_BLOCK_LEN) % TAR_BLOCK_LEN;
        self.out.resize(self.out.len() + pad, 0);
        self.entries += 1;
        Ok(self)
    }

    /// Number of entries appended so far.
    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Terminates the archive with two zero blocks and returns the tar bytes.
    pub fn finish(mut self) -> Vec<u8> {
        self.out.resize(self.out.len() + TAR_BLOCK_LEN * 2, 0);
        self.out
    }

    /// Terminates the archive and gzips it.
    pub fn finish_gzip(self) -> Result<Vec<u8>> {
        let tar = self.finish();
        Ok(gzip::compress(&tar)?)
    }
}

fn write_field(hdr: &mut [u8; TAR_BLOCK_LEN], offset: usize, value: &[u8]) {
    hdr[offset..offset + value.len()].copy_from_slice(value);
}
