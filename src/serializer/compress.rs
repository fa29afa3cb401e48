use std::fmt;
use std::io::Write;
use std::sync::Arc;

use zstd::{Decoder, Encoder};

use super::ScratchBuffer;
use crate::error::{FooterError, Result};

/// Default zstd compression level
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// A pluggable byte transform applied to each encoded record
///
/// Compressors are stateless and shared between serializer clones; all
/// working memory lives in the caller's [`ScratchBuffer`].
pub trait Compressor: Send + Sync + fmt::Debug {
    /// Name written to the footer so a reader can pick the same compressor
    fn name(&self) -> &'static str;

    /// Replaces the contents of `dst` with the compressed form of `src`
    fn compress(&self, src: &[u8], dst: &mut ScratchBuffer) -> Result<()>;

    /// Replaces the contents of `dst` with the decompressed form of `src`
    fn decompress(&self, src: &[u8], dst: &mut ScratchBuffer) -> Result<()>;
}

/// Per-record zstd compression
#[derive(Debug, Clone, Copy)]
pub struct ZstdCompressor {
    level: i32,
}
impl ZstdCompressor {
    #[must_use]
    pub fn new(level: i32) -> Self {
        Self { level }
    }

    #[must_use]
    pub fn level(&self) -> i32 {
        self.level
    }
}
impl Default for ZstdCompressor {
    fn default() -> Self {
        Self::new(DEFAULT_COMPRESSION_LEVEL)
    }
}
impl Compressor for ZstdCompressor {
    fn name(&self) -> &'static str {
        "zstd"
    }

    fn compress(&self, src: &[u8], dst: &mut ScratchBuffer) -> Result<()> {
        dst.clear();
        let mut encoder = Encoder::new(dst, self.level)?;
        encoder.write_all(src)?;
        encoder.finish()?;
        Ok(())
    }

    fn decompress(&self, src: &[u8], dst: &mut ScratchBuffer) -> Result<()> {
        dst.clear();
        let mut decoder = Decoder::with_buffer(src)?;
        std::io::copy(&mut decoder, dst)?;
        dst.rewind();
        Ok(())
    }
}

/// Resolves a compressor from the name stored in a footer
///
/// Streams are always decoded at the default level; zstd frames carry
/// everything the decoder needs.
pub fn compressor_by_name(name: &str) -> Result<Arc<dyn Compressor>> {
    match name {
        "zstd" => Ok(Arc::new(ZstdCompressor::default())),
        _ => Err(FooterError::UnknownCompressor(name.to_string()).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zstd_round_trip_reuses_buffers() -> Result<()> {
        let compressor = ZstdCompressor::default();
        let plain = b"ACGT".repeat(256);

        let mut packed = ScratchBuffer::new();
        let mut unpacked = ScratchBuffer::new();
        compressor.compress(&plain, &mut packed)?;
        assert!(packed.len() < plain.len());

        compressor.decompress(packed.as_slice(), &mut unpacked)?;
        assert_eq!(unpacked.as_slice(), plain.as_slice());
        assert_eq!(unpacked.position(), 0);

        // a second, smaller record fully replaces the first
        compressor.compress(b"TT", &mut packed)?;
        compressor.decompress(packed.as_slice(), &mut unpacked)?;
        assert_eq!(unpacked.as_slice(), b"TT");
        Ok(())
    }

    #[test]
    fn test_unknown_compressor() {
        assert!(compressor_by_name("zstd").is_ok());
        assert!(matches!(
            compressor_by_name("lz4"),
            Err(crate::Error::FooterError(FooterError::UnknownCompressor(name))) if name == "lz4"
        ));
    }
}
