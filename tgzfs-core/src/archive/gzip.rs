//! gzip layer of a `.tgz` archive.
//!
//! `MultiGzDecoder` treats concatenated members as a single stream. The magic
//! bytes are checked up front so that plain or empty input is rejected
//! without depending on decoder behavior for short reads.

use std::io::{self, Read, Write};

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{Result, TgzfsError};

/// gzip magic bytes (RFC 1952).
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[inline(always)]
pub fn is_gzip_magic(header: &[u8]) -> bool {
    header.len() >= 2 && header[0] == GZIP_MAGIC[0] && header[1] == GZIP_MAGIC[1]
}

/// Inflates a complete gzip buffer.
///
/// Fails with [`TgzfsError::Decompression`] on foreign magic, corrupt deflate
/// data, checksum mismatch or a truncated stream.
pub fn decompress(input: &[u8]) -> Result<Vec<u8>> {
    if !is_gzip_magic(input) {
        return Err(TgzfsError::Decompression {
            source: io::Error::new(io::ErrorKind::InvalidData, "missing gzip magic bytes"),
        });
    }

    let mut out = Vec::with_capacity(input.len().saturating_mul(4));
    MultiGzDecoder::new(input)
        .read_to_end(&mut out)
        .map_err(|source| TgzfsError::Decompression { source })?;
    Ok(out)
}

/// Gzips `data` with the default compression level.
pub fn compress(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}
