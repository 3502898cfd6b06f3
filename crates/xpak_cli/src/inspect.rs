//! `xpak inspect`: container validation and extraction.
//!
//! Validates the header, detects the codec of a compressed payload from its
//! stream signature, unpacks it and, when the payload is a table container,
//! lists the items. A payload counts as a table when it starts with the
//! prefixed-index tag or when the file is a scene or script bundle; other
//! payloads are never reinterpreted. The metadata sidecar next to the file is shown when
//! present.

use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use xpak_pak::codec::DEFAULT_LEVEL;
use xpak_pak::{
    create_codec, decode_pak, read_metadata, sidecar_path, CodecKind, Metadata, PakHeader,
    PakTable, TableLayout, CONTAINER_EXTENSION, HEADER_SIZE, TABLE_TAG,
};
use xpak_config::ManifestKind;

use crate::{GlobalArgs, InspectArgs, ReportFormat};

/// What `inspect` found in a container.
#[derive(Debug, Serialize)]
pub struct Inspection {
    /// The inspected file.
    pub path: PathBuf,
    /// Size of the file on disk.
    pub stored_size: u64,
    /// Whether the payload is compressed.
    pub compressed: bool,
    /// Codec detected for a compressed payload.
    pub codec: Option<CodecKind>,
    /// Payload size recorded in the header.
    pub uncompressed_size: u64,
    /// Index of a table payload.
    pub table: Option<TableSummary>,
    /// Contents of the metadata sidecar.
    pub metadata: Option<Metadata>,
}

/// Index of a table payload.
#[derive(Debug, Serialize)]
pub struct TableSummary {
    /// Index layout.
    pub layout: TableLayout,
    /// Entries in container order.
    pub entries: Vec<EntrySummary>,
}

/// One table entry.
#[derive(Debug, Serialize)]
pub struct EntrySummary {
    /// Item name.
    pub name: String,
    /// Item length in bytes.
    pub size: u32,
    /// Absolute offset in the payload.
    pub offset: u32,
}

/// Runs the `xpak inspect` command. Returns exit code 0 on success.
pub fn run(args: &InspectArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let buffer = fs::read(&args.file).map_err(|e| format!("{}: {e}", args.file.display()))?;
    let (inspection, payload, table) = inspect(&args.file, &buffer)?;

    match global.format {
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&inspection)?),
        ReportFormat::Text => print!("{}", render_text(&inspection)),
    }

    if let Some(dir) = &args.extract {
        let written = match &table {
            Some(table) => extract_table(table, dir)?,
            None => {
                let stem = args
                    .file
                    .file_stem()
                    .ok_or_else(|| format!("{} has no file name", args.file.display()))?;
                fs::create_dir_all(dir)?;
                let out = dir.join(stem);
                fs::write(&out, &payload)?;
                vec![out]
            }
        };
        if !global.quiet {
            for path in &written {
                eprintln!("   Extracted {}", path.display());
            }
        }
    }
    Ok(0)
}

/// Validates `buffer` and decodes its payload.
fn inspect(
    path: &Path,
    buffer: &[u8],
) -> Result<(Inspection, Vec<u8>, Option<PakTable>), Box<dyn std::error::Error>> {
    let header = PakHeader::validate(buffer)?;
    let codec_kind = if header.compressed {
        let kind = CodecKind::detect(&buffer[HEADER_SIZE..])
            .ok_or_else(|| format!("{}: unrecognized compressed stream", path.display()))?;
        Some(kind)
    } else {
        None
    };
    let codec = codec_kind.and_then(|kind| create_codec(kind, DEFAULT_LEVEL));
    let payload = decode_pak(buffer, codec.as_deref())?;

    let table = if payload.starts_with(&TABLE_TAG) || is_bundle(path) {
        Some(PakTable::parse(payload.clone())?)
    } else {
        tracing::debug!("{} holds a single payload", path.display());
        None
    };
    let summary = table.as_ref().map(|t| TableSummary {
        layout: t.layout(),
        entries: t
            .entries()
            .iter()
            .map(|e| EntrySummary {
                name: e.name.clone(),
                size: e.size,
                offset: e.offset,
            })
            .collect(),
    });

    let sidecar = sidecar_path(path);
    let metadata = if sidecar.is_file() {
        Some(read_metadata(&sidecar)?)
    } else {
        None
    };

    let inspection = Inspection {
        path: path.to_path_buf(),
        stored_size: buffer.len() as u64,
        compressed: header.compressed,
        codec: codec_kind,
        uncompressed_size: header.uncompressed_size,
        table: summary,
        metadata,
    };
    Ok((inspection, payload, table))
}

/// Whether `path` is named like a scene or script bundle.
fn is_bundle(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    [ManifestKind::Scenes, ManifestKind::Scripts]
        .iter()
        .any(|kind| name == format!("{}.{CONTAINER_EXTENSION}", kind.folder().to_lowercase()))
}

/// Writes every table item to `dir/<name>`.
fn extract_table(table: &PakTable, dir: &Path) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut written = Vec::with_capacity(table.entries().len());
    for (entry, bytes) in table.iter() {
        let rel = Path::new(&entry.name);
        if !rel.components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(format!("refusing to extract '{}' outside {}", entry.name, dir.display()).into());
        }
        let out = dir.join(rel);
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&out, bytes)?;
        written.push(out);
    }
    Ok(written)
}

fn render_text(inspection: &Inspection) -> String {
    let mut out = format!("{}\n", inspection.path.display());
    out.push_str(&format!("  stored size:  {} bytes\n", inspection.stored_size));
    match inspection.codec {
        Some(codec) => out.push_str(&format!("  compression:  {codec}\n")),
        None => out.push_str("  compression:  none\n"),
    }
    out.push_str(&format!(
        "  payload size: {} bytes\n",
        inspection.uncompressed_size
    ));
    if let Some(table) = &inspection.table {
        let layout = match table.layout {
            TableLayout::Fixed => "fixed",
            TableLayout::Prefixed => "prefixed",
        };
        out.push_str(&format!(
            "  table:        {} items ({layout} index)\n",
            table.entries.len()
        ));
        for e in &table.entries {
            out.push_str(&format!("    {:<24} {:>10} @ {}\n", e.name, e.size, e.offset));
        }
    }
    if let Some(metadata) = &inspection.metadata {
        out.push_str("  metadata:\n");
        for (key, value) in metadata {
            out.push_str(&format!("    {key} = {value}\n"));
        }
    }
    out
}
