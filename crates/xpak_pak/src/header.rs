//! The fixed 16-byte container header.

use crate::error::PakError;

/// Magic bytes identifying a packed artifact.
pub const PAK_MAGIC: [u8; 4] = *b"XPAK";

/// Size of the header in bytes, independent of flags.
pub const HEADER_SIZE: usize = 16;

/// Sanity ceiling for the declared original size of an artifact (10 GB).
pub const MAX_ASSET_SIZE: u64 = 10_000_000_000;

/// Decoded container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PakHeader {
    /// Whether the payload was compressed by a codec.
    pub compressed: bool,
    /// Length of the payload before compression.
    pub uncompressed_size: u64,
}

impl PakHeader {
    /// Creates a header.
    pub fn new(compressed: bool, uncompressed_size: u64) -> Self {
        Self {
            compressed,
            uncompressed_size,
        }
    }

    /// Encodes the header: magic, three zero bytes, flag byte, little-endian size.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[..4].copy_from_slice(&PAK_MAGIC);
        bytes[7] = u8::from(self.compressed);
        bytes[8..].copy_from_slice(&self.uncompressed_size.to_le_bytes());
        bytes
    }

    /// Decodes the first 16 bytes of `buffer`, checking the magic, the reserved
    /// bytes, the flag and the size ceiling.
    ///
    /// Does not look at the payload; see [`validate`](Self::validate).
    pub fn parse(buffer: &[u8]) -> Result<Self, PakError> {
        let Some(bytes) = buffer.get(..HEADER_SIZE) else {
            return Err(PakError::Truncated { len: buffer.len() });
        };

        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        if magic != PAK_MAGIC {
            return Err(PakError::BadMagic { found: magic });
        }

        let mut padding = [0u8; 3];
        padding.copy_from_slice(&bytes[4..7]);
        if padding != [0, 0, 0] {
            return Err(PakError::NonZeroPadding { found: padding });
        }

        let compressed = match bytes[7] {
            0 => false,
            1 => true,
            other => return Err(PakError::InvalidFlag(other)),
        };

        let mut size = [0u8; 8];
        size.copy_from_slice(&bytes[8..16]);
        let uncompressed_size = u64::from_le_bytes(size);
        if uncompressed_size > MAX_ASSET_SIZE {
            return Err(PakError::SizeTooLarge {
                size: uncompressed_size,
                max: MAX_ASSET_SIZE,
            });
        }

        Ok(Self {
            compressed,
            uncompressed_size,
        })
    }

    /// Validates a whole container buffer and returns its header.
    ///
    /// In addition to [`parse`](Self::parse), an uncompressed container must
    /// not declare fewer bytes than it stores.
    pub fn validate(buffer: &[u8]) -> Result<Self, PakError> {
        let header = Self::parse(buffer)?;
        let payload = (buffer.len() - HEADER_SIZE) as u64;
        if !header.compressed && header.uncompressed_size < payload {
            return Err(PakError::SizeTooSmall {
                declared: header.uncompressed_size,
                payload,
            });
        }
        Ok(header)
    }
}
