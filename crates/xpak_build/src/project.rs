//! The build orchestrator.

use std::path::Path;
use std::sync::Arc;

use xpak_cache::{ChecksumStore, CACHE_FILE};
use xpak_config::{ConfigError, ManifestKind, ProjectDescriptor};

use crate::error::BuildError;
use crate::manifest::Manifest;
use crate::report::BuildReport;
use crate::tools::Toolset;

/// A loaded project: descriptor, checksum store and the three manifests.
///
/// The project is the single owner of the checksum store. Manifests share it
/// while building; only the project persists or clears it.
pub struct Project {
    descriptor: ProjectDescriptor,
    store: Arc<ChecksumStore>,
    manifests: Vec<Manifest>,
    tools: Toolset,
    pool: Option<rayon::ThreadPool>,
}

impl Project {
    /// Loads a project with the settings from its `xpak.toml`, if any.
    pub fn load(descriptor: &Path) -> Result<Self, BuildError> {
        Self::load_with_jobs(descriptor, None)
    }

    /// Like [`Project::load`], but a `jobs` override takes precedence over
    /// the worker count from `xpak.toml`.
    pub fn load_with_jobs(descriptor: &Path, jobs: Option<usize>) -> Result<Self, BuildError> {
        let project = xpak_config::load_project(descriptor)?;
        let settings = xpak_config::load_settings(&project.root)?;
        Self::from_descriptor(
            project,
            Toolset::from_settings(&settings.build),
            jobs.or(settings.build.jobs),
        )
    }

    /// Loads a project with explicit tools and worker count.
    ///
    /// `jobs = None` uses the global rayon pool.
    pub fn load_with(
        descriptor: &Path,
        tools: Toolset,
        jobs: Option<usize>,
    ) -> Result<Self, BuildError> {
        let project = xpak_config::load_project(descriptor)?;
        Self::from_descriptor(project, tools, jobs)
    }

    fn from_descriptor(
        descriptor: ProjectDescriptor,
        tools: Toolset,
        jobs: Option<usize>,
    ) -> Result<Self, BuildError> {
        for kind in ManifestKind::ALL {
            let path = descriptor.manifest_path(kind);
            if !path.is_file() {
                return Err(ConfigError::MissingManifest { path }.into());
            }
        }

        let store = Arc::new(ChecksumStore::load(&descriptor.root)?);
        let manifests = ManifestKind::ALL
            .into_iter()
            .map(|kind| Manifest::load(&descriptor, kind, Arc::clone(&store)))
            .collect::<Result<Vec<_>, _>>()?;

        let pool = match jobs {
            Some(n) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| BuildError::ThreadPool {
                        reason: e.to_string(),
                    })?,
            ),
            None => None,
        };

        tracing::info!(
            "loaded project '{}' {} ({} checksums cached)",
            descriptor.name,
            descriptor.version,
            store.len()
        );
        Ok(Self {
            descriptor,
            store,
            manifests,
            tools,
            pool,
        })
    }

    /// The parsed project descriptor.
    pub fn descriptor(&self) -> &ProjectDescriptor {
        &self.descriptor
    }

    /// Worker threads of the dedicated pool; `None` when builds run on the
    /// global rayon pool.
    pub fn jobs(&self) -> Option<usize> {
        self.pool.as_ref().map(rayon::ThreadPool::current_num_threads)
    }

    /// The shared checksum store.
    pub fn store(&self) -> &ChecksumStore {
        &self.store
    }

    /// The manifests in build order.
    pub fn manifests(&self) -> &[Manifest] {
        &self.manifests
    }

    /// Builds every manifest in order, then saves the checksum store.
    ///
    /// The store is saved only when every manifest returned `Ok`; the first
    /// fatal error stops the build and leaves the cache file as it was.
    pub fn build(&self) -> Result<BuildReport, BuildError> {
        let mut report = BuildReport {
            project: self.descriptor.name.clone(),
            manifests: Vec::with_capacity(self.manifests.len()),
        };
        for manifest in &self.manifests {
            tracing::info!("building {}", manifest.kind());
            let manifest_report = self.run(|| manifest.build(&self.tools))?;
            report.manifests.push(manifest_report);
        }
        self.store.save(&self.descriptor.root)?;

        tracing::info!(
            "build finished: {} built, {} up to date, {} failed",
            report.built_count(),
            report.skipped_count(),
            report.failure_count()
        );
        Ok(report)
    }

    /// Removes every manifest's output, then builds.
    pub fn rebuild(&self) -> Result<BuildReport, BuildError> {
        self.clean()?;
        self.build()
    }

    /// Removes every manifest's output. Checksums are kept.
    pub fn clean(&self) -> Result<(), BuildError> {
        for manifest in &self.manifests {
            manifest.clean()?;
        }
        Ok(())
    }

    /// Forgets every checksum and deletes the cache file.
    pub fn reset_cache(&self) -> Result<(), BuildError> {
        self.store.clear();
        let path = self.descriptor.root.join(CACHE_FILE);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!("removed {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BuildError::io(path, e)),
        }
    }

    fn run<T: Send>(&self, op: impl FnOnce() -> T + Send) -> T {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }
}

impl std::fmt::Debug for Project {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Project")
            .field("descriptor", &self.descriptor)
            .field("manifests", &self.manifests)
            .field("tools", &self.tools)
            .finish_non_exhaustive()
    }
}
