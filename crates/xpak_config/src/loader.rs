//! Project and manifest descriptor loading and validation.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use quick_xml::events::Event;
use serde::Deserialize;
use xpak_common::AssetKind;

use crate::error::ConfigError;
use crate::types::{ManifestDescriptor, ManifestKind, ProjectDescriptor, SourceItem};

#[derive(Deserialize)]
struct ProjectDocument {
    #[serde(rename = "@name", default)]
    name: String,
    #[serde(rename = "@version", default)]
    version: String,
    #[serde(rename = "@author", default)]
    author: String,
    #[serde(rename = "ContentDirectory", default)]
    content_directory: Option<String>,
    #[serde(rename = "BuildDirectory", default)]
    build_directory: Option<String>,
}

#[derive(Deserialize)]
struct ManifestDocument {
    #[serde(rename = "@compress", default)]
    compress: Option<bool>,
    #[serde(rename = "$value", default)]
    items: Vec<ItemElement>,
}

#[derive(Deserialize)]
enum ItemElement {
    Asset(RawItem),
    Scene(RawItem),
    Script(RawItem),
}

impl ItemElement {
    fn into_parts(self) -> (ManifestKind, RawItem) {
        match self {
            Self::Asset(item) => (ManifestKind::Assets, item),
            Self::Scene(item) => (ManifestKind::Scenes, item),
            Self::Script(item) => (ManifestKind::Scripts, item),
        }
    }
}

#[derive(Deserialize)]
struct RawItem {
    #[serde(rename = "@name", default)]
    name: String,
    #[serde(rename = "Type", default)]
    kind: Option<String>,
    #[serde(rename = "Source", default)]
    source: Option<String>,
}

/// Loads a `*.xproj` project descriptor.
///
/// The content and build directories are resolved against the folder that
/// contains the descriptor.
pub fn load_project(path: &Path) -> Result<ProjectDescriptor, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
    parse_project(&content, path)
}

/// Parses project descriptor text as if it had been read from `path`.
pub fn parse_project(content: &str, path: &Path) -> Result<ProjectDescriptor, ConfigError> {
    expect_root(content, path, "Project")?;
    let doc: ProjectDocument = quick_xml::de::from_str(content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let required = |value: Option<String>, field: &str| {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::MissingField {
                path: path.to_path_buf(),
                field: field.to_string(),
            })
    };
    let name = required(Some(doc.name), "Project@name")?;
    let content_directory = required(doc.content_directory, "ContentDirectory")?;
    let build_directory = required(doc.build_directory, "BuildDirectory")?;

    let root = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    Ok(ProjectDescriptor {
        name,
        version: doc.version,
        author: doc.author,
        content_dir: root.join(content_directory),
        build_dir: root.join(build_directory),
        root,
    })
}

/// Loads the descriptor of `kind` from the project's content directory and
/// checks that every referenced source exists.
pub fn load_manifest(
    project: &ProjectDescriptor,
    kind: ManifestKind,
) -> Result<ManifestDescriptor, ConfigError> {
    let path = project.manifest_path(kind);
    if !path.is_file() {
        return Err(ConfigError::MissingManifest { path });
    }
    let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::io(&path, e))?;
    let manifest = parse_manifest(kind, &content, &path)?;

    let source_root = project.source_root(kind);
    for item in &manifest.items {
        let source = item.source_path(&source_root);
        if !source.is_file() {
            return Err(ConfigError::MissingSource {
                manifest: path.clone(),
                item: item.name.clone(),
                path: source,
            });
        }
    }

    tracing::debug!(
        "loaded {} manifest with {} items from {}",
        kind,
        manifest.items.len(),
        path.display()
    );
    Ok(manifest)
}

/// Parses and validates manifest descriptor text without touching sources.
pub fn parse_manifest(
    kind: ManifestKind,
    content: &str,
    path: &Path,
) -> Result<ManifestDescriptor, ConfigError> {
    expect_root(content, path, kind.folder())?;
    let doc: ManifestDocument =
        quick_xml::de::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let mut names = HashSet::new();
    let mut items = Vec::with_capacity(doc.items.len());
    for element in doc.items {
        let (element_kind, raw) = element.into_parts();
        if element_kind != kind {
            return Err(ConfigError::invalid(
                path,
                format!(
                    "unexpected <{}> element in the {} manifest",
                    element_kind.item_element(),
                    kind
                ),
            ));
        }
        let item = validate_item(kind, raw, path)?;
        if !names.insert(item.name.clone()) {
            return Err(ConfigError::DuplicateName {
                path: path.to_path_buf(),
                name: item.name,
            });
        }
        items.push(item);
    }

    Ok(ManifestDescriptor {
        kind,
        compress: doc.compress.unwrap_or(true),
        items,
    })
}

/// Fails unless the document element of `content` is `<expected>`.
fn expect_root(content: &str, path: &Path, expected: &str) -> Result<(), ConfigError> {
    let parse_error = |reason: String| ConfigError::Parse {
        path: path.to_path_buf(),
        reason,
    };
    let mut reader = quick_xml::Reader::from_str(content);
    loop {
        match reader.read_event().map_err(|e| parse_error(e.to_string()))? {
            Event::Start(e) | Event::Empty(e) => {
                let found = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if found == expected {
                    return Ok(());
                }
                return Err(ConfigError::invalid(
                    path,
                    format!("expected a <{expected}> root element, found <{found}>"),
                ));
            }
            Event::Eof => return Err(parse_error(format!("no <{expected}> root element"))),
            _ => {}
        }
    }
}

fn validate_item(kind: ManifestKind, raw: RawItem, path: &Path) -> Result<SourceItem, ConfigError> {
    let name = raw.name.trim().to_string();
    if name.is_empty() {
        return Err(ConfigError::MissingField {
            path: path.to_path_buf(),
            field: format!("{}@name", kind.item_element()),
        });
    }

    let source = raw
        .source
        .map(|s| s.trim().replace('\\', "/"))
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ConfigError::MissingField {
            path: path.to_path_buf(),
            field: format!("Source of '{name}'"),
        })?;
    if !is_contained(Path::new(&source)) {
        return Err(ConfigError::invalid(
            path,
            format!("source '{source}' of '{name}' escapes the {kind} folder"),
        ));
    }

    let asset_kind = match (kind, raw.kind) {
        (ManifestKind::Assets, None) => {
            return Err(ConfigError::MissingField {
                path: path.to_path_buf(),
                field: format!("Type of '{name}'"),
            })
        }
        (ManifestKind::Assets, Some(t)) => {
            t.parse::<AssetKind>()
                .map_err(|e| ConfigError::UnknownAssetType {
                    path: path.to_path_buf(),
                    item: name.clone(),
                    reason: e.to_string(),
                })?
        }
        (_, None) => AssetKind::Text,
        (_, Some(t)) => match t.parse::<AssetKind>() {
            Ok(AssetKind::Text) => AssetKind::Text,
            _ => {
                return Err(ConfigError::invalid(
                    path,
                    format!("'{name}' declares type '{t}', {kind} are always Text"),
                ))
            }
        },
    };

    Ok(SourceItem {
        name,
        kind: asset_kind,
        source,
    })
}

/// Returns `true` if `path` is relative and never climbs above its root.
fn is_contained(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
