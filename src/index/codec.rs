//! Compression capability for the index blob
//!
//! The codec is a capability rather than a hard dependency: builds without
//! the `zstd` feature have no default codec, and any index operation that
//! needs one fails with `IndexError::CodecUnavailable`.

use std::fmt::Debug;
use std::io;
use std::sync::Arc;

/// Byte-stream compressor used to persist the index
pub trait IndexCodec: Send + Sync + Debug {
    /// Short codec name used in error messages
    fn name(&self) -> &'static str;

    /// Compress a full index payload
    fn compress(&self, data: &[u8]) -> io::Result<Vec<u8>>;

    /// Decompress a full index payload
    fn decompress(&self, data: &[u8]) -> io::Result<Vec<u8>>;
}

/// Zstandard codec
#[cfg(feature = "zstd")]
#[derive(Debug, Clone, Copy)]
pub struct ZstdCodec {
    level: i32,
}

#[cfg(feature = "zstd")]
impl ZstdCodec {
    /// Default compression level
    pub const DEFAULT_LEVEL: i32 = 3;

    /// Create a codec with an explicit level
    pub fn with_level(level: i32) -> Self {
        Self { level }
    }
}

#[cfg(feature = "zstd")]
impl Default for ZstdCodec {
    fn default() -> Self {
        Self::with_level(Self::DEFAULT_LEVEL)
    }
}

#[cfg(feature = "zstd")]
impl IndexCodec for ZstdCodec {
    fn name(&self) -> &'static str {
        "zstd"
    }

    fn compress(&self, data: &[u8]) -> io::Result<Vec<u8>> {
        zstd::encode_all(data, self.level)
    }

    fn decompress(&self, data: &[u8]) -> io::Result<Vec<u8>> {
        zstd::decode_all(data)
    }
}

/// The codec this build provides, if any
pub fn default_codec() -> Option<Arc<dyn IndexCodec>> {
    #[cfg(feature = "zstd")]
    {
        Some(Arc::new(ZstdCodec::default()))
    }
    #[cfg(not(feature = "zstd"))]
    {
        None
    }
}
