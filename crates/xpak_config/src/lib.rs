//! Parsing and validation of XPak project descriptors, manifest descriptors
//! and the optional `xpak.toml` tool settings.
//!
//! Descriptors are XML and produce strongly-typed [`ProjectDescriptor`] and
//! [`ManifestDescriptor`] values; settings are TOML and produce [`Settings`].

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod settings;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_manifest, load_project, parse_manifest, parse_project};
pub use settings::{load_settings, load_settings_from_str, BuildSettings, Settings, SETTINGS_FILE};
pub use types::*;
