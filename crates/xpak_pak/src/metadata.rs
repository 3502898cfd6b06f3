//! Metadata sidecars.
//!
//! A sidecar holds the flat key/value metadata a processor emitted for an
//! asset, stored next to the artifact as `<Metadata><key>value</key>...</Metadata>`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::PakError;
use crate::pak::replace_file;
use crate::METADATA_EXTENSION;

/// Flat string metadata, ordered by key.
pub type Metadata = BTreeMap<String, String>;

/// Returns the sidecar path belonging to an artifact path.
pub fn sidecar_path(artifact: &Path) -> PathBuf {
    artifact.with_extension(METADATA_EXTENSION)
}

/// Renders metadata as a sidecar document.
pub fn encode_metadata(metadata: &Metadata) -> Result<String, PakError> {
    if let Some(key) = metadata.keys().find(|k| !is_element_name(k)) {
        return Err(PakError::InvalidMetadataKey { key: key.clone() });
    }

    let err = |e: quick_xml::DeError| PakError::Metadata {
        path: PathBuf::new(),
        reason: e.to_string(),
    };
    let mut xml = String::new();
    let mut ser = quick_xml::se::Serializer::with_root(&mut xml, Some("Metadata")).map_err(err)?;
    ser.indent(' ', 2);
    metadata.serialize(ser).map_err(err)?;
    xml.push('\n');
    Ok(xml)
}

/// Parses a sidecar document.
pub fn decode_metadata(xml: &str) -> Result<Metadata, PakError> {
    quick_xml::de::from_str(xml).map_err(|e| PakError::Metadata {
        path: PathBuf::new(),
        reason: e.to_string(),
    })
}

/// Writes `metadata` to `path`, replacing any existing file.
pub fn write_metadata(path: &Path, metadata: &Metadata) -> Result<(), PakError> {
    let xml = encode_metadata(metadata).map_err(|e| with_path(e, path))?;
    replace_file(path, xml.as_bytes())
}

/// Reads the sidecar at `path`.
pub fn read_metadata(path: &Path) -> Result<Metadata, PakError> {
    let xml = std::fs::read_to_string(path).map_err(|e| PakError::io(path, e))?;
    decode_metadata(&xml).map_err(|e| with_path(e, path))
}

fn with_path(err: PakError, path: &Path) -> PakError {
    match err {
        PakError::Metadata { reason, .. } => PakError::Metadata {
            path: path.to_path_buf(),
            reason,
        },
        other => other,
    }
}

/// Checks `name` against a conservative subset of XML element names.
fn is_element_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return false;
    }
    if name.len() >= 3 && name[..3].eq_ignore_ascii_case("xml") {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}
