//! Pluggable payload compression.
//!
//! The container header only records whether a payload is compressed and how
//! large it was beforehand, so reader and writer must agree on the codec.
//! [`CodecKind::detect`] recognizes the stream signatures of the bundled codecs
//! for tools that inspect artifacts of unknown origin.

use std::fmt;
use std::io::{self, Read, Write};
use std::str::FromStr;
use std::sync::Arc;

use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;
use serde::{Deserialize, Serialize};

/// Default compression level for every bundled codec.
pub const DEFAULT_LEVEL: u32 = 6;

/// Errors raised by a codec.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The encoder failed.
    #[error("{codec} compression failed: {source}")]
    Compress {
        /// Name of the codec.
        codec: &'static str,
        /// The underlying error.
        source: io::Error,
    },

    /// The decoder failed (corrupt or truncated stream).
    #[error("{codec} decompression failed: {source}")]
    Decompress {
        /// Name of the codec.
        codec: &'static str,
        /// The underlying error.
        source: io::Error,
    },

    /// The decompressed length differs from the size recorded by the writer.
    #[error("decompressed size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        /// The size recorded in the container.
        expected: u64,
        /// The number of bytes actually produced (capped at `expected + 1`).
        actual: u64,
    },
}

/// A byte-buffer compression algorithm.
///
/// Implementations must be usable from several worker threads at once.
pub trait Codec: Send + Sync {
    /// Short identifier used in logs and configuration.
    fn name(&self) -> &'static str;

    /// Compresses `data`.
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError>;

    /// Decompresses `data`, which must expand to exactly `expected_size` bytes.
    fn decompress(&self, data: &[u8], expected_size: u64) -> Result<Vec<u8>, CodecError>;
}

/// The codecs bundled with the pipeline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecKind {
    /// Deflate with a zlib header.
    #[default]
    Zlib,
    /// Deflate with a gzip header.
    Gzip,
    /// LZMA2 in an xz stream.
    Lzma,
    /// No compression; payloads are stored verbatim.
    None,
}

impl CodecKind {
    /// Returns the configuration name of this codec.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Zlib => "zlib",
            Self::Gzip => "gzip",
            Self::Lzma => "lzma",
            Self::None => "none",
        }
    }

    /// Guesses the codec of a compressed stream from its leading bytes.
    pub fn detect(data: &[u8]) -> Option<Self> {
        match data {
            [0x1f, 0x8b, ..] => Some(Self::Gzip),
            [0xfd, b'7', b'z', b'X', b'Z', 0x00, ..] => Some(Self::Lzma),
            [cmf, flg, ..] if cmf & 0x0f == 8 && (u16::from(*cmf) << 8 | u16::from(*flg)) % 31 == 0 => {
                Some(Self::Zlib)
            }
            _ => None,
        }
    }
}

impl fmt::Display for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CodecKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "zlib" | "deflate" => Ok(Self::Zlib),
            "gzip" | "gz" => Ok(Self::Gzip),
            "lzma" | "xz" => Ok(Self::Lzma),
            "none" => Ok(Self::None),
            _ => Err(format!(
                "unknown codec '{s}' (valid: zlib, gzip, lzma, none)"
            )),
        }
    }
}

/// Instantiates a bundled codec. Returns `None` for [`CodecKind::None`].
///
/// `level` is clamped to `0..=9`.
pub fn create_codec(kind: CodecKind, level: u32) -> Option<Arc<dyn Codec>> {
    let level = level.min(9);
    match kind {
        CodecKind::Zlib => Some(Arc::new(ZlibCodec { level })),
        CodecKind::Gzip => Some(Arc::new(GzipCodec { level })),
        CodecKind::Lzma => Some(Arc::new(LzmaCodec { level })),
        CodecKind::None => None,
    }
}

/// Deflate with a zlib header.
#[derive(Debug, Clone, Copy)]
pub struct ZlibCodec {
    /// Compression level, `0..=9`.
    pub level: u32,
}

impl Codec for ZlibCodec {
    fn name(&self) -> &'static str {
        "zlib"
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(self.level));
        encoder
            .write_all(data)
            .and_then(|()| encoder.finish())
            .map_err(|source| CodecError::Compress {
                codec: self.name(),
                source,
            })
    }

    fn decompress(&self, data: &[u8], expected_size: u64) -> Result<Vec<u8>, CodecError> {
        read_exact_size(ZlibDecoder::new(data), self.name(), expected_size)
    }
}

/// Deflate with a gzip header.
#[derive(Debug, Clone, Copy)]
pub struct GzipCodec {
    /// Compression level, `0..=9`.
    pub level: u32,
}

impl Codec for GzipCodec {
    fn name(&self) -> &'static str {
        "gzip"
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::new(self.level));
        encoder
            .write_all(data)
            .and_then(|()| encoder.finish())
            .map_err(|source| CodecError::Compress {
                codec: self.name(),
                source,
            })
    }

    fn decompress(&self, data: &[u8], expected_size: u64) -> Result<Vec<u8>, CodecError> {
        read_exact_size(GzDecoder::new(data), self.name(), expected_size)
    }
}

/// LZMA2 in an xz container.
#[derive(Debug, Clone, Copy)]
pub struct LzmaCodec {
    /// Compression preset, `0..=9`.
    pub level: u32,
}

impl Codec for LzmaCodec {
    fn name(&self) -> &'static str {
        "lzma"
    }

    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut encoder = xz2::write::XzEncoder::new(Vec::new(), self.level);
        encoder
            .write_all(data)
            .and_then(|()| encoder.finish())
            .map_err(|source| CodecError::Compress {
                codec: self.name(),
                source,
            })
    }

    fn decompress(&self, data: &[u8], expected_size: u64) -> Result<Vec<u8>, CodecError> {
        read_exact_size(xz2::read::XzDecoder::new(data), self.name(), expected_size)
    }
}

/// Drains a decoder, refusing to produce more than `expected + 1` bytes.
fn read_exact_size<R: Read>(
    decoder: R,
    codec: &'static str,
    expected: u64,
) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    decoder
        .take(expected.saturating_add(1))
        .read_to_end(&mut out)
        .map_err(|source| CodecError::Decompress { codec, source })?;
    let actual = out.len() as u64;
    if actual != expected {
        return Err(CodecError::SizeMismatch { expected, actual });
    }
    Ok(out)
}
