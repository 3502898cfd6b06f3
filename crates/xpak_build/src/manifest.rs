//! Manifest builds.
//!
//! A [`Manifest`] binds a parsed descriptor to its source root, its output
//! root and the project's shared checksum store. Assets are packed one
//! artifact per item; scenes and scripts are bundled into a single table
//! container per manifest.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use rayon::prelude::*;
use xpak_cache::{ChecksumStore, Freshness, SourceHasher};
use xpak_common::ContentHash;
use xpak_config::{ConfigError, ManifestDescriptor, ManifestKind, ProjectDescriptor, SourceItem};
use xpak_pak::CONTAINER_EXTENSION;

use crate::error::BuildError;
use crate::report::ManifestReport;
use crate::tools::Toolset;
use crate::{assets, bundle};

/// One content manifest ready to build.
#[derive(Debug)]
pub struct Manifest {
    descriptor: ManifestDescriptor,
    source_root: PathBuf,
    output_root: PathBuf,
    store: Arc<ChecksumStore>,
}

impl Manifest {
    /// Loads the manifest of `kind` for `project`, checking that its
    /// descriptor exists and every declared source is present.
    pub fn load(
        project: &ProjectDescriptor,
        kind: ManifestKind,
        store: Arc<ChecksumStore>,
    ) -> Result<Self, BuildError> {
        let descriptor = xpak_config::load_manifest(project, kind)?;
        let manifest = Self::new(
            descriptor,
            project.source_root(kind),
            project.output_root(kind),
            store,
        );
        manifest.check_artifact_collisions(&project.manifest_path(kind))?;
        Ok(manifest)
    }

    /// Binds an already validated descriptor to explicit roots.
    pub fn new(
        descriptor: ManifestDescriptor,
        source_root: PathBuf,
        output_root: PathBuf,
        store: Arc<ChecksumStore>,
    ) -> Self {
        Self {
            descriptor,
            source_root,
            output_root,
            store,
        }
    }

    /// Which manifest this is.
    pub fn kind(&self) -> ManifestKind {
        self.descriptor.kind
    }

    /// Declared items in document order.
    pub fn items(&self) -> &[SourceItem] {
        &self.descriptor.items
    }

    /// Whether outputs are compressed.
    pub fn compress(&self) -> bool {
        self.descriptor.compress
    }

    /// Root the declared sources are resolved against.
    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    /// Root all artifacts of this manifest are written under.
    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub(crate) fn store(&self) -> &ChecksumStore {
        &self.store
    }

    /// Artifact written for `item`.
    ///
    /// Assets map to their source path with the container extension; bundled
    /// items all share the manifest's bundle.
    pub fn artifact_path(&self, item: &SourceItem) -> PathBuf {
        match self.kind() {
            ManifestKind::Assets => self
                .output_root
                .join(&item.source)
                .with_extension(CONTAINER_EXTENSION),
            ManifestKind::Scenes | ManifestKind::Scripts => self.bundle_path(),
        }
    }

    /// The bundle container of a scene or script manifest, e.g. `scenes.xpkf`.
    pub fn bundle_path(&self) -> PathBuf {
        self.output_root.join(format!(
            "{}.{}",
            self.kind().folder().to_lowercase(),
            CONTAINER_EXTENSION
        ))
    }

    /// Processes every new or changed item and writes its artifact.
    ///
    /// Hashing and processing errors abort the manifest. Codec and write
    /// failures are logged and recorded in the returned report.
    pub fn build(&self, tools: &Toolset) -> Result<ManifestReport, BuildError> {
        std::fs::create_dir_all(&self.output_root)
            .map_err(|e| BuildError::io(&self.output_root, e))?;
        match self.kind() {
            ManifestKind::Assets => assets::build(self, tools),
            ManifestKind::Scenes | ManifestKind::Scripts => bundle::build(self, tools),
        }
    }

    /// Removes the manifest's output tree. The checksum store is untouched.
    pub fn clean(&self) -> Result<(), BuildError> {
        match std::fs::remove_dir_all(&self.output_root) {
            Ok(()) => {
                tracing::info!("cleaned {}", self.output_root.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BuildError::io(&self.output_root, e)),
        }
    }

    /// [`clean`](Self::clean) followed by [`build`](Self::build).
    pub fn rebuild(&self, tools: &Toolset) -> Result<ManifestReport, BuildError> {
        self.clean()?;
        self.build(tools)
    }

    /// Hashes every item in parallel and classifies it against the store.
    pub(crate) fn classify(&self) -> Result<Vec<Candidate<'_>>, BuildError> {
        let candidates = self
            .items()
            .par_iter()
            .enumerate()
            .map(|(index, item)| -> Result<Candidate, BuildError> {
                let key = item.cache_key(self.kind());
                let source = item.source_path(&self.source_root);
                let output = self.artifact_path(item);
                let (hash, freshness) = SourceHasher::check(&self.store, &key, &source, &output)?;
                Ok(Candidate {
                    index,
                    item,
                    key,
                    source,
                    hash,
                    freshness,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        for c in &candidates {
            tracing::debug!("{}: {:?}", c.key, c.freshness);
        }
        Ok(candidates)
    }

    fn check_artifact_collisions(&self, descriptor: &Path) -> Result<(), BuildError> {
        if self.kind() != ManifestKind::Assets {
            return Ok(());
        }
        let mut seen: HashMap<PathBuf, &str> = HashMap::new();
        for item in self.items() {
            if let Some(other) = seen.insert(self.artifact_path(item), &item.name) {
                return Err(ConfigError::Invalid {
                    path: descriptor.to_path_buf(),
                    reason: format!(
                        "assets '{other}' and '{}' would both be packed to {}",
                        item.name,
                        self.artifact_path(item).display()
                    ),
                }
                .into());
            }
        }
        Ok(())
    }
}

/// An item together with its current hash and rebuild decision.
pub(crate) struct Candidate<'a> {
    pub index: usize,
    pub item: &'a SourceItem,
    pub key: String,
    pub source: PathBuf,
    pub hash: ContentHash,
    pub freshness: Freshness,
}

/// Shared `[i/N]` progress counter.
pub(crate) struct Progress {
    counter: AtomicUsize,
    total: usize,
}

impl Progress {
    pub fn new(total: usize) -> Self {
        Self {
            counter: AtomicUsize::new(0),
            total,
        }
    }

    /// Claims the next position, logs the item being built and returns the
    /// 1-based position shown in the `[i/N]` label.
    pub fn next(&self, name: &str) -> usize {
        let i = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::info!("[{i}/{}] Building {name}", self.total);
        i
    }

    /// Called once every claimed item is done. Each announced item must have
    /// claimed exactly one position.
    pub fn finish(&self) {
        let claimed = self.counter.load(Ordering::Relaxed);
        debug_assert_eq!(claimed, self.total, "progress total does not match built items");
        tracing::trace!("{claimed}/{} items announced", self.total);
    }
}

/// Thread-safe collector of per-item results, re-ordered by manifest index.
pub(crate) struct Outcomes<T> {
    entries: Mutex<Vec<(usize, T)>>,
}

impl<T> Outcomes<T> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn record(&self, index: usize, outcome: T) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((index, outcome));
    }

    pub fn into_sorted(self) -> Vec<T> {
        let mut entries = self
            .entries
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        entries.sort_by_key(|(index, _)| *index);
        entries.into_iter().map(|(_, outcome)| outcome).collect()
    }
}
