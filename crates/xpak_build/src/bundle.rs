//! Bundled scene and script containers.
//!
//! All items of the manifest are stored in one table container wrapped in a
//! pak header. When any item changes the whole bundle is rewritten; items
//! that did not change are copied from the previous bundle when it can be
//! read, and processed again otherwise.

use std::path::Path;

use rayon::prelude::*;
use xpak_pak::{read_pak, write_pak, Codec, PakTable};

use crate::error::BuildError;
use crate::manifest::{Manifest, Progress};
use crate::report::{ItemFailure, ManifestReport};
use crate::tools::Toolset;

pub(crate) fn build(manifest: &Manifest, tools: &Toolset) -> Result<ManifestReport, BuildError> {
    let kind = manifest.kind();
    let mut report = ManifestReport::new(kind);
    let bundle = manifest.bundle_path();
    let codec = tools.codec_for(manifest.compress());

    let candidates = manifest.classify()?;
    let previous = read_previous(&bundle, codec);
    let index_current = previous.as_ref().is_some_and(|table| {
        table
            .entries()
            .iter()
            .map(|e| e.name.as_str())
            .eq(manifest.items().iter().map(|i| i.name.as_str()))
    });
    if index_current && !candidates.iter().any(|c| c.freshness.needs_rebuild()) {
        report.skipped = candidates.len();
        tracing::info!("{kind}: all {} items up to date", report.skipped);
        return Ok(report);
    }

    let reusable = |name: &str, needs_rebuild: bool| {
        if needs_rebuild {
            None
        } else {
            previous.as_ref().and_then(|table| table.get(name))
        }
    };
    let to_process = candidates
        .iter()
        .filter(|c| reusable(&c.item.name, c.freshness.needs_rebuild()).is_none())
        .count();
    let progress = Progress::new(to_process);

    let texts = candidates
        .par_iter()
        .map(|c| -> Result<(Vec<u8>, bool), BuildError> {
            if let Some(bytes) = reusable(&c.item.name, c.freshness.needs_rebuild()) {
                return Ok((bytes.to_vec(), false));
            }
            progress.next(&c.item.name);
            let processed = tools
                .processors
                .process(c.item.kind, &c.source)
                .map_err(|source| BuildError::Process {
                    name: c.item.name.clone(),
                    path: c.source.clone(),
                    source,
                })?;
            Ok((processed.payload, true))
        })
        .collect::<Result<Vec<_>, _>>()?;
    progress.finish();

    let entries: Vec<(&str, &[u8])> = candidates
        .iter()
        .zip(&texts)
        .map(|(c, (text, _))| (c.item.name.as_str(), text.as_slice()))
        .collect();

    let bundle_name = bundle
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let written = PakTable::build(tools.table_layout, &entries)
        .and_then(|table| write_pak(&bundle, table.as_bytes(), codec));
    match written {
        Ok(bytes) => {
            tracing::debug!(
                "wrote {} ({} items, {bytes} bytes)",
                bundle.display(),
                entries.len()
            );
            for c in &candidates {
                manifest.store().update(c.key.clone(), c.hash);
            }
            report.built = candidates
                .iter()
                .zip(&texts)
                .filter(|(_, (_, processed))| *processed)
                .map(|(c, _)| c.item.name.clone())
                .collect();
            report.skipped = candidates.len() - report.built.len();
        }
        Err(e) => {
            tracing::error!("failed to write {}: {e}", bundle.display());
            report.failures.push(ItemFailure {
                name: bundle_name,
                message: e.to_string(),
            });
        }
    }
    Ok(report)
}

/// Decodes the existing bundle, if any. An unreadable bundle is rebuilt from
/// sources, so errors only get logged.
fn read_previous(bundle: &Path, codec: Option<&dyn Codec>) -> Option<PakTable> {
    if !bundle.exists() {
        return None;
    }
    match read_pak(bundle, codec).and_then(PakTable::parse) {
        Ok(table) => Some(table),
        Err(e) => {
            tracing::debug!("ignoring previous {}: {e}", bundle.display());
            None
        }
    }
}
