//! The XPak binary container formats.
//!
//! Packed artifacts are written with a fixed 16-byte header followed by the
//! (optionally compressed) payload. Small texts such as scenes and scripts are
//! batched into a single table container, and per-asset metadata is stored in
//! an XML sidecar next to the artifact.
//!
//! ```text
//! +---------------+---------+--------+
//! | Field         | Size    | Offset |
//! +---------------+---------+--------+
//! | Magic "XPAK"  | 4       | 0      |
//! | Reserved (0)  | 3       | 4      |
//! | Compressed    | 1       | 7      |
//! | Original size | 8 (LE)  | 8      |
//! | Payload       | dynamic | 16     |
//! +---------------+---------+--------+
//! ```

#![warn(missing_docs)]

pub mod codec;
pub mod error;
pub mod header;
pub mod metadata;
pub mod pak;
pub mod table;

pub use codec::{create_codec, Codec, CodecError, CodecKind};
pub use error::PakError;
pub use header::{PakHeader, HEADER_SIZE, MAX_ASSET_SIZE, PAK_MAGIC};
pub use metadata::{
    decode_metadata, encode_metadata, read_metadata, sidecar_path, write_metadata, Metadata,
};
pub use pak::{decode_pak, encode_pak, pack, read_pak, write_pak};
pub use table::{PakTable, TableEntry, TableLayout, TABLE_TAG};

/// File extension of packed artifacts.
pub const CONTAINER_EXTENSION: &str = "xpkf";

/// File extension of metadata sidecars.
pub const METADATA_EXTENSION: &str = "xmdf";
