//! Error types for checksum store operations.

use std::path::PathBuf;

/// Errors that can occur while hashing sources or persisting the checksum store.
///
/// Unlike a best-effort cache, every variant here is fatal to the build:
/// change detection cannot proceed without a hash, and a store that cannot be
/// read back would silently force or suppress rebuilds.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while reading a source or the cache file.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The persisted cache file exists but is not a valid cache document.
    #[error("failed to parse build cache {path}: {reason}")]
    Parse {
        /// The cache file path.
        path: PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// A record in the cache file holds something other than a SHA-256 hex digest.
    #[error("invalid checksum for '{key}' in {path}: {reason}")]
    InvalidChecksum {
        /// The cache file path.
        path: PathBuf,
        /// The record key whose checksum is malformed.
        key: String,
        /// Description of the problem.
        reason: String,
    },

    /// The in-memory store could not be serialized.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_display() {
        let err = CacheError::Io {
            path: PathBuf::from("/tmp/project/Content/Assets/ball.png"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        };
        let msg = err.to_string();
        assert!(msg.contains("cache I/O error"));
        assert!(msg.contains("ball.png"));
    }

    #[test]
    fn parse_display() {
        let err = CacheError::Parse {
            path: PathBuf::from(".build_cache"),
            reason: "unexpected EOF".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains(".build_cache"));
        assert!(msg.contains("unexpected EOF"));
    }

    #[test]
    fn invalid_checksum_display() {
        let err = CacheError::InvalidChecksum {
            path: PathBuf::from(".build_cache"),
            key: "Assets/ball.png".to_string(),
            reason: "invalid hash length".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Assets/ball.png"));
        assert!(msg.contains("invalid hash length"));
    }

    #[test]
    fn serialization_error_display() {
        let err = CacheError::Serialization {
            reason: "writer failed".to_string(),
        };
        assert!(err.to_string().contains("writer failed"));
    }
}
