//! Build outcome reporting.

use serde::Serialize;
use xpak_config::ManifestKind;

/// A per-item failure that did not abort the build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    /// Item name, or the bundle file name for bundled manifests.
    pub name: String,
    /// Error message.
    pub message: String,
}

/// Outcome of building one manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestReport {
    /// Which manifest was built.
    pub kind: ManifestKind,
    /// Items that were processed, in manifest order.
    pub built: Vec<String>,
    /// Number of items whose artifact was up to date.
    pub skipped: usize,
    /// Items whose processor produced an empty payload.
    pub empty: Vec<String>,
    /// Items whose artifact could not be compressed or written.
    pub failures: Vec<ItemFailure>,
}

impl ManifestReport {
    /// An empty report for `kind`.
    pub fn new(kind: ManifestKind) -> Self {
        Self {
            kind,
            built: Vec::new(),
            skipped: 0,
            empty: Vec::new(),
            failures: Vec::new(),
        }
    }
}

/// Outcome of building a whole project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    /// Project name.
    pub project: String,
    /// One report per manifest in build order.
    pub manifests: Vec<ManifestReport>,
}

impl BuildReport {
    /// Total number of processed items.
    pub fn built_count(&self) -> usize {
        self.manifests.iter().map(|m| m.built.len()).sum()
    }

    /// Total number of up-to-date items.
    pub fn skipped_count(&self) -> usize {
        self.manifests.iter().map(|m| m.skipped).sum()
    }

    /// Total number of soft failures.
    pub fn failure_count(&self) -> usize {
        self.manifests.iter().map(|m| m.failures.len()).sum()
    }

    /// Returns `true` if no item failed.
    pub fn is_success(&self) -> bool {
        self.failure_count() == 0
    }

    /// The report for `kind`, if that manifest was built.
    pub fn manifest(&self, kind: ManifestKind) -> Option<&ManifestReport> {
        self.manifests.iter().find(|m| m.kind == kind)
    }
}
