//! The capabilities a build runs with.

use std::sync::Arc;

use xpak_config::BuildSettings;
use xpak_pak::codec::DEFAULT_LEVEL;
use xpak_pak::{create_codec, Codec, CodecKind, TableLayout};

use crate::processor::ProcessorSet;

/// Processors, codec and container layout shared by every manifest.
#[derive(Clone)]
pub struct Toolset {
    /// Processor per asset kind.
    pub processors: ProcessorSet,
    /// Codec used by manifests that request compression; `None` stores
    /// every payload uncompressed.
    pub codec: Option<Arc<dyn Codec>>,
    /// Index layout of bundled scene and script containers.
    pub table_layout: TableLayout,
}

impl Toolset {
    /// Bundled processors, zlib at the default level and prefixed tables.
    pub fn new() -> Self {
        Self {
            processors: ProcessorSet::new(),
            codec: create_codec(CodecKind::Zlib, DEFAULT_LEVEL),
            table_layout: TableLayout::default(),
        }
    }

    /// Bundled processors with the codec and layout chosen in `xpak.toml`.
    pub fn from_settings(settings: &BuildSettings) -> Self {
        Self {
            processors: ProcessorSet::new(),
            codec: create_codec(settings.codec, settings.level),
            table_layout: settings.table_layout,
        }
    }

    /// The codec a manifest with the given `compress` flag should use.
    pub fn codec_for(&self, compress: bool) -> Option<&dyn Codec> {
        if compress {
            self.codec.as_deref()
        } else {
            None
        }
    }
}

impl Default for Toolset {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Toolset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toolset")
            .field("codec", &self.codec.as_ref().map(|c| c.name()))
            .field("table_layout", &self.table_layout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_select_codec() {
        let settings = BuildSettings {
            codec: CodecKind::Lzma,
            ..BuildSettings::default()
        };
        let tools = Toolset::from_settings(&settings);
        assert_eq!(tools.codec_for(true).map(|c| c.name()), Some("lzma"));
        assert!(tools.codec_for(false).is_none());
    }

    #[test]
    fn none_codec_disables_compression() {
        let settings = BuildSettings {
            codec: CodecKind::None,
            ..BuildSettings::default()
        };
        assert!(Toolset::from_settings(&settings).codec_for(true).is_none());
    }

    #[test]
    fn default_is_zlib_prefixed() {
        let tools = Toolset::default();
        assert_eq!(tools.codec_for(true).map(|c| c.name()), Some("zlib"));
        assert_eq!(tools.table_layout, TableLayout::Prefixed);
    }
}
