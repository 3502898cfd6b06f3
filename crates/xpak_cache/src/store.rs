//! The checksum store shared by all manifests during a build.
//!
//! The store maps a source key (the source path relative to the content root)
//! to the SHA-256 of that file when it was last built. It is persisted as
//! `.build_cache` in the project root:
//!
//! ```xml
//! <BuildCache>
//!   <Asset source="Assets/ball.png">ba7816bf...</Asset>
//! </BuildCache>
//! ```
//!
//! Records are written in sorted key order so that two identical stores always
//! serialize to identical bytes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use xpak_common::ContentHash;

use crate::error::CacheError;
use crate::hasher::SourceHasher;

/// Name of the cache file within the project root.
pub const CACHE_FILE: &str = ".build_cache";

/// On-disk shape of the cache document.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheDocument {
    #[serde(rename = "Asset", default)]
    records: Vec<CacheRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheRecord {
    #[serde(rename = "@source")]
    source: String,
    #[serde(rename = "$text", default)]
    checksum: String,
}

/// Thread-safe mapping from source key to content hash.
///
/// Worker threads call [`update`](Self::update) concurrently while a manifest
/// builds, so every access goes through an internal mutex. The project owns
/// the store and shares it with its manifests through an `Arc`.
#[derive(Debug, Default)]
pub struct ChecksumStore {
    entries: Mutex<BTreeMap<String, ContentHash>>,
}

impl ChecksumStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the path of the cache file for a project root.
    pub fn file_path(project_root: &Path) -> PathBuf {
        project_root.join(CACHE_FILE)
    }

    /// Loads the store persisted under `project_root`.
    ///
    /// A missing cache file yields an empty store. A file that exists but
    /// cannot be read or parsed is an error.
    pub fn load(project_root: &Path) -> Result<Self, CacheError> {
        let path = Self::file_path(project_root);
        if !path.exists() {
            tracing::debug!("no build cache at {}, starting empty", path.display());
            return Ok(Self::new());
        }
        Self::from_file(&path)
    }

    /// Loads a store from an explicit cache file path.
    pub fn from_file(path: &Path) -> Result<Self, CacheError> {
        let content = std::fs::read_to_string(path).map_err(|e| CacheError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let doc: CacheDocument =
            quick_xml::de::from_str(&content).map_err(|e| CacheError::Parse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let mut entries = BTreeMap::new();
        for record in doc.records {
            let hash = record
                .checksum
                .parse::<ContentHash>()
                .map_err(|e| CacheError::InvalidChecksum {
                    path: path.to_path_buf(),
                    key: record.source.clone(),
                    reason: e.to_string(),
                })?;
            entries.insert(record.source, hash);
        }

        tracing::debug!("loaded {} checksums from {}", entries.len(), path.display());
        Ok(Self {
            entries: Mutex::new(entries),
        })
    }

    /// Serializes the store to `<project_root>/.build_cache`.
    pub fn save(&self, project_root: &Path) -> Result<(), CacheError> {
        let path = Self::file_path(project_root);
        let xml = self.to_xml()?;
        std::fs::write(&path, xml).map_err(|e| CacheError::Io { path, source: e })
    }

    /// Renders the store as the cache document text.
    pub fn to_xml(&self) -> Result<String, CacheError> {
        let doc = CacheDocument {
            records: self
                .lock()
                .iter()
                .map(|(source, hash)| CacheRecord {
                    source: source.clone(),
                    checksum: hash.to_hex(),
                })
                .collect(),
        };

        let mut xml = String::new();
        let mut ser = quick_xml::se::Serializer::with_root(&mut xml, Some("BuildCache"))
            .map_err(|e| CacheError::Serialization {
                reason: e.to_string(),
            })?;
        ser.indent(' ', 2);
        doc.serialize(ser).map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;
        xml.push('\n');
        Ok(xml)
    }

    /// Computes the content hash of a file on disk.
    pub fn calculate_checksum(path: &Path) -> Result<ContentHash, CacheError> {
        SourceHasher::hash_file(path)
    }

    /// Returns the recorded hash for `key`, if any.
    ///
    /// `None` means the source was never built or the cache was reset.
    pub fn get_checksum(&self, key: &str) -> Option<ContentHash> {
        self.lock().get(key).copied()
    }

    /// Records `hash` for `key`, replacing any previous value.
    pub fn update(&self, key: impl Into<String>, hash: ContentHash) {
        self.lock().insert(key.into(), hash);
    }

    /// Removes the entry for `key`, returning its previous hash.
    pub fn remove(&self, key: &str) -> Option<ContentHash> {
        self.lock().remove(key)
    }

    /// Empties the in-memory store. The cache file on disk is left untouched.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Returns the number of tracked keys.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if no keys are tracked.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Returns a copy of every entry, in key order.
    pub fn snapshot(&self) -> BTreeMap<String, ContentHash> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, ContentHash>> {
        // A panicking worker cannot leave the map half-updated: every
        // mutation is a single insert/remove.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn new_store_is_empty() {
        let store = ChecksumStore::new();
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
        assert!(store.get_checksum("Assets/ball.png").is_none());
    }

    #[test]
    fn update_overwrites() {
        let store = ChecksumStore::new();
        let h1 = ContentHash::from_bytes(b"one");
        let h2 = ContentHash::from_bytes(b"two");
        store.update("Assets/ball.png", h1);
        store.update("Assets/ball.png", h2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get_checksum("Assets/ball.png"), Some(h2));
    }

    #[test]
    fn remove_and_clear() {
        let store = ChecksumStore::new();
        let h = ContentHash::from_bytes(b"x");
        store.update("a", h);
        store.update("b", h);
        assert_eq!(store.remove("a"), Some(h));
        assert_eq!(store.remove("a"), None);
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChecksumStore::new();
        store.update("Assets/ball.png", ContentHash::from_bytes(b"ball"));
        store.update("Scenes/Main.xscene", ContentHash::from_bytes(b"scene"));
        store.save(dir.path()).unwrap();

        let loaded = ChecksumStore::load(dir.path()).unwrap();
        assert_eq!(loaded.snapshot(), store.snapshot());
    }

    #[test]
    fn cache_file_format() {
        let store = ChecksumStore::new();
        let hash = ContentHash::from_bytes(b"abc");
        store.update("Assets/ball.png", hash);
        let xml = store.to_xml().unwrap();
        assert!(xml.starts_with("<BuildCache>"));
        assert!(xml.contains(&format!(
            "<Asset source=\"Assets/ball.png\">{}</Asset>",
            hash.to_hex()
        )));
    }

    #[test]
    fn load_hand_written_cache() {
        let dir = tempfile::tempdir().unwrap();
        let hash = ContentHash::from_bytes(b"abc");
        let xml = format!(
            "<BuildCache>\n\t<Asset source=\"Assets/ball.png\">{}</Asset>\n</BuildCache>\n",
            hash.to_hex()
        );
        std::fs::write(dir.path().join(CACHE_FILE), xml).unwrap();

        let store = ChecksumStore::load(dir.path()).unwrap();
        assert_eq!(store.get_checksum("Assets/ball.png"), Some(hash));
    }

    #[test]
    fn identical_stores_serialize_identically() {
        let a = ChecksumStore::new();
        let b = ChecksumStore::new();
        for key in ["z.png", "a.png", "m.wav"] {
            a.update(key, ContentHash::from_bytes(key.as_bytes()));
        }
        for key in ["m.wav", "z.png", "a.png"] {
            b.update(key, ContentHash::from_bytes(key.as_bytes()));
        }
        assert_eq!(a.to_xml().unwrap(), b.to_xml().unwrap());
    }

    #[test]
    fn empty_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        ChecksumStore::new().save(dir.path()).unwrap();
        let loaded = ChecksumStore::load(dir.path()).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn load_nonexistent_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChecksumStore::load(dir.path()).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn load_corrupt_xml_errors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CACHE_FILE), "<BuildCache><Asset").unwrap();
        let err = ChecksumStore::load(dir.path()).unwrap_err();
        assert!(matches!(err, CacheError::Parse { .. }));
    }

    #[test]
    fn load_bad_checksum_errors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CACHE_FILE),
            "<BuildCache><Asset source=\"Assets/ball.png\">nothex</Asset></BuildCache>",
        )
        .unwrap();
        let err = ChecksumStore::load(dir.path()).unwrap_err();
        match err {
            CacheError::InvalidChecksum { key, .. } => assert_eq!(key, "Assets/ball.png"),
            other => panic!("expected InvalidChecksum, got {other:?}"),
        }
    }

    #[test]
    fn save_into_missing_directory_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does").join("not").join("exist");
        let err = ChecksumStore::new().save(&missing).unwrap_err();
        assert!(matches!(err, CacheError::Io { .. }));
    }

    #[test]
    fn clear_does_not_delete_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChecksumStore::new();
        store.update("a", ContentHash::from_bytes(b"a"));
        store.save(dir.path()).unwrap();
        store.clear();
        assert!(ChecksumStore::file_path(dir.path()).exists());
    }

    #[test]
    fn concurrent_updates_are_not_lost() {
        let store = Arc::new(ChecksumStore::new());
        let mut handles = Vec::new();

        for t in 0..16 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for i in 0..250 {
                    let key = format!("Assets/t{t}/item{i}.png");
                    store.update(key.clone(), ContentHash::from_bytes(key.as_bytes()));
                    assert!(store.get_checksum(&key).is_some());
                }
            }));
        }

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(store.len(), 16 * 250);
        let snapshot = store.snapshot();
        for (key, hash) in snapshot {
            assert_eq!(hash, ContentHash::from_bytes(key.as_bytes()));
        }
    }

    #[test]
    fn concurrent_updates_same_key_keep_one_entry() {
        let store = Arc::new(ChecksumStore::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..100 {
                        let value = format!("{t}-{i}");
                        store.update("shared", ContentHash::from_bytes(value.as_bytes()));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.len(), 1);
    }
}
