//! Compression Engine
//!
//! LZ4 block compression for message bodies. The compressed form carries a
//! 4-byte little-endian size prefix (lz4 "prepend size" mode) so the receiver
//! can size its output buffer exactly.
//!
//! A body is only sent compressed when that makes it strictly smaller; the
//! header flag tells the receiver which form arrived.

use crate::error::{CodecError, CodecResult};
use tracing::debug;

/// Upper bound on a decompressed body, checked before allocating
pub const DEFAULT_MAX_DECOMPRESSED_SIZE: usize = 64 * 1024 * 1024;

const SIZE_PREFIX_LEN: usize = 4;

/// LZ4 compressor with a decompression size guard
#[derive(Debug, Clone)]
pub struct CompressionEngine {
    max_decompressed_size: usize,
}

impl Default for CompressionEngine {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DECOMPRESSED_SIZE)
    }
}

impl CompressionEngine {
    pub fn new(max_decompressed_size: usize) -> Self {
        Self {
            max_decompressed_size,
        }
    }

    pub fn compress(&self, data: &[u8]) -> CodecResult<Vec<u8>> {
        lz4::block::compress(data, None, true).map_err(|e| CodecError::Compression {
            codec: "lz4",
            message: e.to_string(),
        })
    }

    /// Compressed form of `body` if it is strictly smaller, otherwise `None`
    pub fn compress_if_smaller(&self, body: &[u8]) -> Option<Vec<u8>> {
        match self.compress(body) {
            Ok(compressed) if compressed.len() < body.len() => Some(compressed),
            Ok(compressed) => {
                debug!(
                    original = body.len(),
                    compressed = compressed.len(),
                    "Compression not beneficial, sending uncompressed"
                );
                None
            }
            Err(e) => {
                debug!(error = %e, "Compression failed, sending uncompressed");
                None
            }
        }
    }

    /// Decompress a body received with the compressed flag set
    ///
    /// `shape` names the expected payload for error reporting.
    pub fn decompress(&self, shape: &'static str, data: &[u8]) -> CodecResult<Vec<u8>> {
        if data.len() < SIZE_PREFIX_LEN {
            return Err(CodecError::corrupt(
                shape,
                format!("compressed body of {} bytes has no size prefix", data.len()),
            ));
        }

        let declared = i32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        let declared = usize::try_from(declared).map_err(|_| {
            CodecError::corrupt(shape, format!("negative decompressed size {}", declared))
        })?;
        if declared > self.max_decompressed_size {
            return Err(CodecError::corrupt(
                shape,
                format!(
                    "decompressed size {} exceeds limit {}",
                    declared, self.max_decompressed_size
                ),
            ));
        }

        lz4::block::decompress(data, None)
            .map_err(|e| CodecError::corrupt(shape, format!("lz4 decompression failed: {}", e)))
    }
}
