//! Optional `xpak.toml` tool settings.
//!
//! The file sits next to the project descriptor. Every key is optional:
//!
//! ```toml
//! [build]
//! jobs = 8
//! codec = "lzma"
//! level = 6
//! table_layout = "prefixed"
//! ```

use std::path::Path;

use serde::Deserialize;
use xpak_pak::codec::DEFAULT_LEVEL;
use xpak_pak::{CodecKind, TableLayout};

use crate::error::ConfigError;

/// File name of the tool settings file.
pub const SETTINGS_FILE: &str = "xpak.toml";

/// Top-level settings document.
#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    /// Build tuning.
    #[serde(default)]
    pub build: BuildSettings,
}

/// The `[build]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BuildSettings {
    /// Worker thread count; `None` uses one thread per core.
    pub jobs: Option<usize>,
    /// Codec applied to manifests that request compression.
    pub codec: CodecKind,
    /// Codec level, `0..=9`.
    pub level: u32,
    /// Index layout of the bundled scene and script containers.
    pub table_layout: TableLayout,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            jobs: None,
            codec: CodecKind::default(),
            level: DEFAULT_LEVEL,
            table_layout: TableLayout::default(),
        }
    }
}

/// Loads `<project_root>/xpak.toml`, falling back to defaults when absent.
pub fn load_settings(project_root: &Path) -> Result<Settings, ConfigError> {
    let path = project_root.join(SETTINGS_FILE);
    if !path.exists() {
        return Ok(Settings::default());
    }
    let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::io(&path, e))?;
    load_settings_from_str(&content, &path)
}

/// Parses and validates settings text; `path` is only used in errors.
pub fn load_settings_from_str(content: &str, path: &Path) -> Result<Settings, ConfigError> {
    let settings: Settings = toml::from_str(content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    validate_settings(&settings, path)?;
    Ok(settings)
}

fn validate_settings(settings: &Settings, path: &Path) -> Result<(), ConfigError> {
    if settings.build.jobs == Some(0) {
        return Err(ConfigError::invalid(path, "build.jobs must be at least 1"));
    }
    if settings.build.level > 9 {
        return Err(ConfigError::invalid(
            path,
            format!("build.level {} is outside 0..=9", settings.build.level),
        ));
    }
    Ok(())
}
