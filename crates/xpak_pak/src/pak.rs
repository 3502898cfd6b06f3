//! Packing and unpacking of single-payload containers.
//!
//! Artifacts are written as `header || payload`. When a codec is supplied the
//! payload is compressed and the header records the original length; the
//! reader must then be given a codec able to decompress it.

use std::path::Path;

use crate::codec::Codec;
use crate::error::PakError;
use crate::header::{PakHeader, HEADER_SIZE, MAX_ASSET_SIZE};

/// Encodes a container from an already prepared payload.
///
/// `uncompressed_size` is what the header declares. For an uncompressed
/// container it must equal `payload.len()`.
pub fn encode_pak(
    payload: &[u8],
    compressed: bool,
    uncompressed_size: u64,
) -> Result<Vec<u8>, PakError> {
    if uncompressed_size > MAX_ASSET_SIZE {
        return Err(PakError::SizeTooLarge {
            size: uncompressed_size,
            max: MAX_ASSET_SIZE,
        });
    }
    let stored = payload.len() as u64;
    if !compressed && uncompressed_size != stored {
        return Err(if uncompressed_size < stored {
            PakError::SizeTooSmall {
                declared: uncompressed_size,
                payload: stored,
            }
        } else {
            PakError::TruncatedPayload {
                declared: uncompressed_size,
                payload: stored,
            }
        });
    }

    let header = PakHeader::new(compressed, uncompressed_size);
    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
    out.extend_from_slice(&header.to_bytes());
    out.extend_from_slice(payload);
    Ok(out)
}

/// Packs `data`, compressing it with `codec` when one is given.
pub fn pack(data: &[u8], codec: Option<&dyn Codec>) -> Result<Vec<u8>, PakError> {
    let original = data.len() as u64;
    match codec {
        Some(codec) => {
            let compressed = codec.compress(data)?;
            encode_pak(&compressed, true, original)
        }
        None => encode_pak(data, false, original),
    }
}

/// Validates a container buffer and returns the original payload.
pub fn decode_pak(buffer: &[u8], codec: Option<&dyn Codec>) -> Result<Vec<u8>, PakError> {
    let header = PakHeader::validate(buffer)?;
    let payload = &buffer[HEADER_SIZE..];

    if !header.compressed {
        let stored = payload.len() as u64;
        if stored < header.uncompressed_size {
            return Err(PakError::TruncatedPayload {
                declared: header.uncompressed_size,
                payload: stored,
            });
        }
        return Ok(payload.to_vec());
    }

    let codec = codec.ok_or(PakError::MissingCodec)?;
    Ok(codec.decompress(payload, header.uncompressed_size)?)
}

/// Packs `data` and writes it to `path`, replacing any existing file.
///
/// Returns the number of bytes written.
pub fn write_pak(path: &Path, data: &[u8], codec: Option<&dyn Codec>) -> Result<u64, PakError> {
    let bytes = pack(data, codec)?;
    replace_file(path, &bytes)?;
    Ok(bytes.len() as u64)
}

/// Reads and unpacks the container at `path`.
pub fn read_pak(path: &Path, codec: Option<&dyn Codec>) -> Result<Vec<u8>, PakError> {
    let buffer = std::fs::read(path).map_err(|e| PakError::io(path, e))?;
    decode_pak(&buffer, codec)
}

/// Deletes `path` if present, then writes `bytes` to it.
pub(crate) fn replace_file(path: &Path, bytes: &[u8]) -> Result<(), PakError> {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(PakError::io(path, e)),
    }
    std::fs::write(path, bytes).map_err(|e| PakError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{create_codec, CodecKind, DEFAULT_LEVEL};

    #[test]
    fn uncompressed_ten_bytes_is_26_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ten.xpkf");
        let written = write_pak(&path, b"0123456789", None).unwrap();
        assert_eq!(written, 26);

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 26);
        assert_eq!(&bytes[..4], b"XPAK");
        assert_eq!(bytes[7], 0);
        let mut size = [0u8; 8];
        size.copy_from_slice(&bytes[8..16]);
        assert_eq!(u64::from_le_bytes(size), 10);
        assert_eq!(&bytes[16..], b"0123456789");
    }

    #[test]
    fn roundtrip_with_and_without_codec() {
        let dir = tempfile::tempdir().unwrap();
        let payloads: [&[u8]; 3] = [b"", b"x", &[7u8; 10_000]];
        let codecs = [
            None,
            create_codec(CodecKind::Zlib, DEFAULT_LEVEL),
            create_codec(CodecKind::Lzma, DEFAULT_LEVEL),
        ];
        for (i, payload) in payloads.iter().enumerate() {
            for codec in &codecs {
                let path = dir.path().join(format!("item{i}.xpkf"));
                write_pak(&path, payload, codec.as_deref()).unwrap();
                let back = read_pak(&path, codec.as_deref()).unwrap();
                assert_eq!(back.as_slice(), *payload);
            }
        }
    }

    #[test]
    fn compressed_header_records_original_size() {
        let codec = create_codec(CodecKind::Gzip, DEFAULT_LEVEL).unwrap();
        let data = vec![1u8; 4096];
        let bytes = pack(&data, Some(codec.as_ref())).unwrap();
        let header = PakHeader::parse(&bytes).unwrap();
        assert!(header.compressed);
        assert_eq!(header.uncompressed_size, 4096);
        assert!(bytes.len() < 4096);
    }

    #[test]
    fn write_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.xpkf");
        std::fs::write(&path, vec![0xaa; 1000]).unwrap();
        write_pak(&path, b"short", None).unwrap();
        assert_eq!(std::fs::read(&path).unwrap().len(), HEADER_SIZE + 5);
    }

    #[test]
    fn compressed_without_codec_fails() {
        let codec = create_codec(CodecKind::Zlib, DEFAULT_LEVEL).unwrap();
        let bytes = pack(b"payload", Some(codec.as_ref())).unwrap();
        assert!(matches!(
            decode_pak(&bytes, None).unwrap_err(),
            PakError::MissingCodec
        ));
    }

    #[test]
    fn truncated_uncompressed_payload_fails() {
        let mut bytes = PakHeader::new(false, 10).to_bytes().to_vec();
        bytes.extend_from_slice(b"01234");
        assert!(matches!(
            decode_pak(&bytes, None).unwrap_err(),
            PakError::TruncatedPayload {
                declared: 10,
                payload: 5
            }
        ));
    }

    #[test]
    fn wrong_decompressed_size_fails() {
        let codec = create_codec(CodecKind::Zlib, DEFAULT_LEVEL).unwrap();
        let mut bytes = pack(b"payload", Some(codec.as_ref())).unwrap();
        bytes[8..16].copy_from_slice(&3u64.to_le_bytes());
        let err = decode_pak(&bytes, Some(codec.as_ref())).unwrap_err();
        assert!(matches!(err, PakError::Codec(_)));
    }

    #[test]
    fn encode_rejects_inconsistent_sizes() {
        assert!(matches!(
            encode_pak(b"abc", false, 2).unwrap_err(),
            PakError::SizeTooSmall { .. }
        ));
        assert!(matches!(
            encode_pak(b"abc", false, 5).unwrap_err(),
            PakError::TruncatedPayload { .. }
        ));
        assert!(matches!(
            encode_pak(b"abc", true, MAX_ASSET_SIZE + 1).unwrap_err(),
            PakError::SizeTooLarge { .. }
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_pak(Path::new("/nonexistent/a.xpkf"), None).unwrap_err();
        assert!(matches!(err, PakError::Io { .. }));
    }
}
