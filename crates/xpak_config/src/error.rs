//! Error types for descriptor and settings loading.

use std::path::PathBuf;

/// Errors that can occur when loading or validating project descriptors,
/// manifest descriptors or tool settings.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An I/O error occurred while reading a descriptor.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The file content could not be parsed.
    #[error("failed to parse {path}: {reason}")]
    Parse {
        /// The file that failed to parse.
        path: PathBuf,
        /// Parser message.
        reason: String,
    },

    /// A required element or attribute is missing or empty.
    #[error("{path}: missing required field '{field}'")]
    MissingField {
        /// The descriptor file.
        path: PathBuf,
        /// Name of the missing element or attribute.
        field: String,
    },

    /// One of the three manifest descriptors is absent from the content directory.
    #[error("manifest descriptor {path} does not exist")]
    MissingManifest {
        /// Expected location of the manifest.
        path: PathBuf,
    },

    /// A manifest item references a source file that does not exist.
    #[error("{manifest}: source for '{item}' not found at {path}")]
    MissingSource {
        /// The manifest descriptor declaring the item.
        manifest: PathBuf,
        /// The item name.
        item: String,
        /// The resolved source path.
        path: PathBuf,
    },

    /// An asset declares a type that is not one of the known kinds.
    #[error("{path}: asset '{item}' has {reason}")]
    UnknownAssetType {
        /// The manifest descriptor.
        path: PathBuf,
        /// The item name.
        item: String,
        /// Description of the offending type.
        reason: String,
    },

    /// Two items of the same manifest share a name.
    #[error("{path}: duplicate item name '{name}'")]
    DuplicateName {
        /// The manifest descriptor.
        path: PathBuf,
        /// The repeated name.
        name: String,
    },

    /// A value is present but not acceptable.
    #[error("{path}: {reason}")]
    Invalid {
        /// The file holding the value.
        path: PathBuf,
        /// What is wrong with it.
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
