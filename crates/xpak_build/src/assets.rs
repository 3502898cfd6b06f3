//! Per-item asset packing.

use std::path::Path;

use rayon::prelude::*;
use xpak_pak::{sidecar_path, write_metadata, write_pak, Codec};

use crate::error::BuildError;
use crate::manifest::{Manifest, Outcomes, Progress};
use crate::processor::Processed;
use crate::report::{ItemFailure, ManifestReport};
use crate::tools::Toolset;

enum Outcome {
    Built,
    Empty,
    Failed(String),
}

pub(crate) fn build(manifest: &Manifest, tools: &Toolset) -> Result<ManifestReport, BuildError> {
    let kind = manifest.kind();
    let mut report = ManifestReport::new(kind);
    let candidates = manifest.classify()?;
    let selected: Vec<_> = candidates
        .iter()
        .filter(|c| c.freshness.needs_rebuild())
        .collect();
    report.skipped = candidates.len() - selected.len();
    if selected.is_empty() {
        tracing::info!("{kind}: all {} items up to date", report.skipped);
        return Ok(report);
    }

    let codec = tools.codec_for(manifest.compress());
    let progress = Progress::new(selected.len());
    let outcomes = Outcomes::new();

    selected.par_iter().try_for_each(|c| -> Result<(), BuildError> {
        progress.next(&c.item.name);
        let processed = tools
            .processors
            .process(c.item.kind, &c.source)
            .map_err(|source| BuildError::Process {
                name: c.item.name.clone(),
                path: c.source.clone(),
                source,
            })?;

        let artifact = manifest.artifact_path(c.item);
        let outcome = if processed.payload.is_empty() {
            tracing::debug!("{}: empty payload, nothing to pack", c.item.name);
            remove_stale(&artifact);
            remove_stale(&sidecar_path(&artifact));
            Outcome::Empty
        } else {
            match write_artifact(&artifact, &processed, codec) {
                Ok(()) => {
                    manifest.store().update(c.key.clone(), c.hash);
                    Outcome::Built
                }
                Err(e) => {
                    tracing::error!("failed to pack '{}': {e}", c.item.name);
                    Outcome::Failed(e.to_string())
                }
            }
        };
        outcomes.record(c.index, (c.item.name.clone(), outcome));
        Ok(())
    })?;
    progress.finish();

    for (name, outcome) in outcomes.into_sorted() {
        match outcome {
            Outcome::Built => report.built.push(name),
            Outcome::Empty => report.empty.push(name),
            Outcome::Failed(message) => report.failures.push(ItemFailure { name, message }),
        }
    }
    Ok(report)
}

/// Writes the container and, when there is metadata, its sidecar.
fn write_artifact(
    artifact: &Path,
    processed: &Processed,
    codec: Option<&dyn Codec>,
) -> Result<(), BuildError> {
    if let Some(parent) = artifact.parent() {
        std::fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
    }
    let pak_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| BuildError::Pak { path, source }
    };

    let written = write_pak(artifact, &processed.payload, codec).map_err(pak_err(artifact))?;
    tracing::debug!(
        "wrote {} ({} -> {written} bytes)",
        artifact.display(),
        processed.payload.len()
    );

    let sidecar = sidecar_path(artifact);
    if processed.metadata.is_empty() {
        remove_stale(&sidecar);
    } else {
        write_metadata(&sidecar, &processed.metadata).map_err(pak_err(&sidecar))?;
    }
    Ok(())
}

fn remove_stale(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!("removed stale {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("could not remove stale {}: {e}", path.display()),
    }
}
