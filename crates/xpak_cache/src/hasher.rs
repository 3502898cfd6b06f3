//! Source file hashing and the rebuild decision.
//!
//! Every manifest uses the same rule: hash the current source, compare against
//! the stored checksum, and rebuild when the entry is absent, the hash differs,
//! or the previously produced artifact has gone missing.

use std::fs::File;
use std::path::Path;

use xpak_common::ContentHash;

use crate::error::CacheError;
use crate::store::ChecksumStore;

/// Outcome of comparing a source's current hash against the checksum store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// The store has no entry for this key (never built, or cache reset).
    New,
    /// The stored hash differs from the current source contents.
    Modified,
    /// The hash matches but the output artifact no longer exists.
    MissingOutput,
    /// The hash matches and the artifact is present.
    Unchanged,
}

impl Freshness {
    /// Classifies a source from its stored hash, current hash and output state.
    pub fn classify(
        stored: Option<ContentHash>,
        current: ContentHash,
        output_exists: bool,
    ) -> Self {
        match stored {
            None => Self::New,
            Some(prev) if prev != current => Self::Modified,
            Some(_) if !output_exists => Self::MissingOutput,
            Some(_) => Self::Unchanged,
        }
    }

    /// Returns `true` if the source item must be processed again.
    pub fn needs_rebuild(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

/// Utility for computing content hashes of source files.
pub struct SourceHasher;

impl SourceHasher {
    /// Computes the SHA-256 content hash of a single file.
    ///
    /// The file is streamed in fixed-size chunks, so arbitrarily large sources
    /// are never loaded into memory at once.
    pub fn hash_file(path: &Path) -> Result<ContentHash, CacheError> {
        let io_err = |e| CacheError::Io {
            path: path.to_path_buf(),
            source: e,
        };
        let mut file = File::open(path).map_err(io_err)?;
        ContentHash::from_reader(&mut file).map_err(io_err)
    }

    /// Hashes `source` and classifies it against the entry stored under `key`.
    ///
    /// Only reads the store; recording the new hash is left to the caller once
    /// the artifact has been written.
    pub fn check(
        store: &ChecksumStore,
        key: &str,
        source: &Path,
        output: &Path,
    ) -> Result<(ContentHash, Freshness), CacheError> {
        let current = Self::hash_file(source)?;
        let freshness = Freshness::classify(store.get_checksum(key), current, output.exists());
        Ok((current, freshness))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_file_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ball.png");
        std::fs::write(&path, b"not really a png").unwrap();

        let h1 = SourceHasher::hash_file(&path).unwrap();
        let h2 = SourceHasher::hash_file(&path).unwrap();
        assert_eq!(h1, h2);
        assert_eq!(h1, ContentHash::from_bytes(b"not really a png"));
    }

    #[test]
    fn hash_file_different_content() {
        let dir = tempfile::tempdir().unwrap();
        let path_a = dir.path().join("a.bin");
        let path_b = dir.path().join("b.bin");
        std::fs::write(&path_a, "aaa").unwrap();
        std::fs::write(&path_b, "aab").unwrap();

        let h1 = SourceHasher::hash_file(&path_a).unwrap();
        let h2 = SourceHasher::hash_file(&path_b).unwrap();
        assert_ne!(h1, h2);
    }

    #[test]
    fn hash_file_nonexistent_errors() {
        let err = SourceHasher::hash_file(Path::new("/nonexistent/file.png")).unwrap_err();
        assert!(matches!(err, CacheError::Io { .. }));
    }

    #[test]
    fn hash_large_file_streams() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.bin");
        let data: Vec<u8> = (0..1_000_000).map(|i| (i % 256) as u8).collect();
        std::fs::write(&path, &data).unwrap();
        assert_eq!(
            SourceHasher::hash_file(&path).unwrap(),
            ContentHash::from_bytes(&data)
        );
    }

    #[test]
    fn classify_new() {
        let h = ContentHash::from_bytes(b"x");
        assert_eq!(Freshness::classify(None, h, true), Freshness::New);
        assert_eq!(Freshness::classify(None, h, false), Freshness::New);
    }

    #[test]
    fn classify_modified() {
        let old = ContentHash::from_bytes(b"old");
        let new = ContentHash::from_bytes(b"new");
        assert_eq!(Freshness::classify(Some(old), new, true), Freshness::Modified);
    }

    #[test]
    fn classify_missing_output() {
        let h = ContentHash::from_bytes(b"same");
        assert_eq!(
            Freshness::classify(Some(h), h, false),
            Freshness::MissingOutput
        );
    }

    #[test]
    fn classify_unchanged() {
        let h = ContentHash::from_bytes(b"same");
        let f = Freshness::classify(Some(h), h, true);
        assert_eq!(f, Freshness::Unchanged);
        assert!(!f.needs_rebuild());
        assert!(Freshness::New.needs_rebuild());
        assert!(Freshness::Modified.needs_rebuild());
        assert!(Freshness::MissingOutput.needs_rebuild());
    }

    #[test]
    fn check_does_not_mutate_store() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("ball.png");
        let output = dir.path().join("ball.xpkf");
        std::fs::write(&source, b"pixels").unwrap();

        let store = ChecksumStore::new();
        let (hash, freshness) =
            SourceHasher::check(&store, "Assets/ball.png", &source, &output).unwrap();
        assert_eq!(freshness, Freshness::New);
        assert!(store.get_checksum("Assets/ball.png").is_none());

        store.update("Assets/ball.png", hash);
        std::fs::write(&output, b"artifact").unwrap();
        let (_, freshness) =
            SourceHasher::check(&store, "Assets/ball.png", &source, &output).unwrap();
        assert_eq!(freshness, Freshness::Unchanged);
    }
}
