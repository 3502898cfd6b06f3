//! Error types for project and manifest builds.

use std::path::PathBuf;

use xpak_cache::CacheError;
use xpak_config::ConfigError;
use xpak_pak::PakError;

use crate::processor::ProcessError;

/// Fatal errors that abort a build.
///
/// Per-item container and codec failures are not represented here; they are
/// logged and recorded in the [`ManifestReport`](crate::ManifestReport) while
/// the remaining items continue.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// A project or manifest descriptor is missing or invalid, or a declared
    /// source does not exist.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The checksum cache could not be loaded or saved, or a source could
    /// not be hashed.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// A processor rejected a source file.
    #[error("failed to process '{name}' ({path}): {source}")]
    Process {
        /// The item name.
        name: String,
        /// The source file.
        path: PathBuf,
        /// The processor error.
        source: ProcessError,
    },

    /// A container could not be read while inspecting an existing build.
    #[error("invalid container {path}: {source}")]
    Pak {
        /// The container file.
        path: PathBuf,
        /// The container error.
        source: PakError,
    },

    /// A filesystem operation on the build tree failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The worker pool could not be created.
    #[error("failed to start worker pool: {reason}")]
    ThreadPool {
        /// Description from the pool builder.
        reason: String,
    },
}

impl BuildError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
