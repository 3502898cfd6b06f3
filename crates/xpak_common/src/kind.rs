//! Asset kinds declared in manifests.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of a buildable source item.
///
/// Asset manifests declare one of `Texture`, `Audio` or `Data` per item.
/// Scene and script manifests are kind-homogeneous and always use `Text`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetKind {
    /// An image, packed together with its dimensions as metadata.
    Texture,
    /// A PCM sound clip.
    Audio,
    /// Opaque bytes copied through unchanged.
    Data,
    /// UTF-8 text such as scene descriptions and scripts.
    Text,
}

impl AssetKind {
    /// Returns the name used for this kind in manifest descriptors.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Texture => "Texture",
            Self::Audio => "Audio",
            Self::Data => "Data",
            Self::Text => "Text",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for an unrecognized asset kind name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown asset type '{0}' (expected Texture, Audio, Data or Text)")]
pub struct ParseAssetKindError(pub String);

impl FromStr for AssetKind {
    type Err = ParseAssetKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Texture" => Ok(Self::Texture),
            "Audio" => Ok(Self::Audio),
            "Data" => Ok(Self::Data),
            "Text" => Ok(Self::Text),
            other => Err(ParseAssetKindError(other.to_string())),
        }
    }
}
