//! Validated project and manifest descriptors.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use xpak_common::AssetKind;

/// Extension of project descriptor files.
pub const PROJECT_EXTENSION: &str = "xproj";

/// The three kinds of content manifest, in build order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestKind {
    /// Individually packed assets.
    Assets,
    /// Scene documents, bundled into one table container.
    Scenes,
    /// Scripts, bundled into one table container.
    Scripts,
}

impl ManifestKind {
    /// Every manifest kind in build order.
    pub const ALL: [ManifestKind; 3] = [Self::Assets, Self::Scenes, Self::Scripts];

    /// Folder name under both the content and the build directory.
    pub const fn folder(&self) -> &'static str {
        match self {
            Self::Assets => "Assets",
            Self::Scenes => "Scenes",
            Self::Scripts => "Scripts",
        }
    }

    /// File name of the manifest descriptor inside the content directory.
    pub const fn descriptor_file(&self) -> &'static str {
        match self {
            Self::Assets => "Assets.xml",
            Self::Scenes => "Scenes.xml",
            Self::Scripts => "Scripts.xml",
        }
    }

    /// Element name of a single item in the descriptor.
    pub const fn item_element(&self) -> &'static str {
        match self {
            Self::Assets => "Asset",
            Self::Scenes => "Scene",
            Self::Scripts => "Script",
        }
    }
}

impl fmt::Display for ManifestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.folder())
    }
}

/// A parsed `*.xproj` project descriptor.
///
/// Directories are resolved against the folder holding the descriptor.
#[derive(Debug, Clone)]
pub struct ProjectDescriptor {
    /// Project name.
    pub name: String,
    /// Project version string.
    pub version: String,
    /// Project author.
    pub author: String,
    /// Folder holding the descriptor; the checksum cache lives here.
    pub root: PathBuf,
    /// Content directory, resolved against `root`.
    pub content_dir: PathBuf,
    /// Build output directory, resolved against `root`.
    pub build_dir: PathBuf,
}

impl ProjectDescriptor {
    /// Path of the descriptor for `kind` inside the content directory.
    pub fn manifest_path(&self, kind: ManifestKind) -> PathBuf {
        self.content_dir.join(kind.descriptor_file())
    }

    /// Source root of `kind`.
    pub fn source_root(&self, kind: ManifestKind) -> PathBuf {
        self.content_dir.join(kind.folder())
    }

    /// Output root of `kind`.
    pub fn output_root(&self, kind: ManifestKind) -> PathBuf {
        self.build_dir.join(kind.folder())
    }
}

/// One declared item of a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceItem {
    /// Name, unique within the manifest.
    pub name: String,
    /// Asset kind; always [`AssetKind::Text`] for scenes and scripts.
    pub kind: AssetKind,
    /// Source path relative to the manifest's source root, `/`-separated.
    pub source: String,
}

impl SourceItem {
    /// Checksum store key: the source path qualified by the manifest folder.
    pub fn cache_key(&self, manifest: ManifestKind) -> String {
        format!("{}/{}", manifest.folder(), self.source)
    }

    /// Resolves the source file under `source_root`.
    pub fn source_path(&self, source_root: &Path) -> PathBuf {
        source_root.join(&self.source)
    }
}

/// A parsed and validated manifest descriptor.
#[derive(Debug, Clone)]
pub struct ManifestDescriptor {
    /// Which manifest this is.
    pub kind: ManifestKind,
    /// Whether outputs are compressed.
    pub compress: bool,
    /// Declared items in document order.
    pub items: Vec<SourceItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_is_content_relative() {
        let item = SourceItem {
            name: "ball".into(),
            kind: AssetKind::Texture,
            source: "sprites/ball.png".into(),
        };
        assert_eq!(item.cache_key(ManifestKind::Assets), "Assets/sprites/ball.png");
    }

    #[test]
    fn roots_follow_folders() {
        let project = ProjectDescriptor {
            name: "Pong".into(),
            version: "0.1.0".into(),
            author: String::new(),
            root: PathBuf::from("/p"),
            content_dir: PathBuf::from("/p/Content"),
            build_dir: PathBuf::from("/p/Build"),
        };
        assert_eq!(
            project.manifest_path(ManifestKind::Scenes),
            PathBuf::from("/p/Content/Scenes.xml")
        );
        assert_eq!(
            project.source_root(ManifestKind::Assets),
            PathBuf::from("/p/Content/Assets")
        );
        assert_eq!(
            project.output_root(ManifestKind::Scripts),
            PathBuf::from("/p/Build/Scripts")
        );
    }

    #[test]
    fn build_order() {
        assert_eq!(
            ManifestKind::ALL,
            [ManifestKind::Assets, ManifestKind::Scenes, ManifestKind::Scripts]
        );
        assert_eq!(ManifestKind::Scripts.to_string(), "Scripts");
    }
}
