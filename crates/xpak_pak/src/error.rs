//! Error types for container encoding and validation.

use std::path::PathBuf;

use crate::codec::CodecError;

/// Errors produced while writing, reading or validating containers.
///
/// Every malformed-header condition has its own variant so that a reader can
/// report exactly why a buffer was rejected. None of them is ever used to mean
/// "file absent"; that is always an [`Io`](PakError::Io) error.
#[derive(Debug, thiserror::Error)]
pub enum PakError {
    /// An I/O error occurred while reading or writing a container file.
    #[error("pak I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The buffer is shorter than the fixed header.
    #[error("buffer too short for a pak header: {len} bytes")]
    Truncated {
        /// Length of the buffer.
        len: usize,
    },

    /// The first four bytes are not `XPAK`.
    #[error("bad pak magic {found:02x?}, expected \"XPAK\"")]
    BadMagic {
        /// The bytes found in place of the magic.
        found: [u8; 4],
    },

    /// One of the three reserved bytes is non-zero.
    #[error("reserved header bytes are not zero: {found:02x?}")]
    NonZeroPadding {
        /// The reserved bytes as found.
        found: [u8; 3],
    },

    /// The compressed flag holds something other than 0 or 1.
    #[error("invalid compressed flag {0:#04x}")]
    InvalidFlag(u8),

    /// The declared original size exceeds the maximum asset size.
    #[error("declared size {size} exceeds the maximum asset size of {max} bytes")]
    SizeTooLarge {
        /// The declared size.
        size: u64,
        /// The ceiling.
        max: u64,
    },

    /// An uncompressed container declares fewer bytes than it stores.
    #[error("declared size {declared} is smaller than the stored payload of {payload} bytes")]
    SizeTooSmall {
        /// The declared size.
        declared: u64,
        /// The stored payload length.
        payload: u64,
    },

    /// An uncompressed container stores fewer bytes than it declares.
    #[error("payload truncated: declared {declared} bytes, found {payload}")]
    TruncatedPayload {
        /// The declared size.
        declared: u64,
        /// The stored payload length.
        payload: u64,
    },

    /// A compressed container was read without a codec to decompress it.
    #[error("payload is compressed but no codec was provided")]
    MissingCodec,

    /// Compression or decompression failed.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// A table entry name does not fit the table layout.
    #[error("table entry name '{name}' is too long ({len} bytes, limit {max})")]
    NameTooLong {
        /// The offending name.
        name: String,
        /// Its length in bytes.
        len: usize,
        /// The longest name the layout accepts.
        max: usize,
    },

    /// A table entry name cannot be represented in the layout.
    #[error("invalid table entry name '{name}': {reason}")]
    InvalidName {
        /// The offending name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The table container would not fit 32-bit offsets.
    #[error("table container too large: {size} bytes exceeds 32-bit offsets")]
    TableTooLarge {
        /// Total size the container would have.
        size: u64,
    },

    /// A table container could not be decoded.
    #[error("malformed table container: {reason}")]
    MalformedTable {
        /// Description of the problem.
        reason: String,
    },

    /// A metadata key is not a valid XML element name.
    #[error("invalid metadata key '{key}'")]
    InvalidMetadataKey {
        /// The offending key.
        key: String,
    },

    /// A metadata sidecar could not be encoded or decoded.
    #[error("metadata error in {path}: {reason}")]
    Metadata {
        /// The sidecar path (empty for in-memory documents).
        path: PathBuf,
        /// Description of the problem.
        reason: String,
    },
}

impl PakError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedTable {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_magic_display() {
        let err = PakError::BadMagic { found: *b"BAAD" };
        let msg = err.to_string();
        assert!(msg.contains("bad pak magic"));
        assert!(msg.contains("XPAK"));
    }

    #[test]
    fn size_too_large_display() {
        let err = PakError::SizeTooLarge {
            size: 20_000_000_000,
            max: 10_000_000_000,
        };
        let msg = err.to_string();
        assert!(msg.contains("20000000000"));
        assert!(msg.contains("maximum asset size"));
    }

    #[test]
    fn name_too_long_display() {
        let err = PakError::NameTooLong {
            name: "x".repeat(70),
            len: 70,
            max: 63,
        };
        let msg = err.to_string();
        assert!(msg.contains("too long"));
        assert!(msg.contains("limit 63"));
    }

    #[test]
    fn invalid_flag_display() {
        assert_eq!(
            PakError::InvalidFlag(7).to_string(),
            "invalid compressed flag 0x07"
        );
    }
}
