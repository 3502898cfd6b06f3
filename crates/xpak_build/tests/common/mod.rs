//! Shared fixtures for on-disk project tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;
use xpak_build::{
    AudioProcessor, DataProcessor, ProcessError, Processed, Processor, ProcessorSet,
    TextProcessor, TextureProcessor, Toolset,
};
use xpak_common::AssetKind;

pub const PROJECT: &str = r#"<Project name="Pong" version="0.1.0" author="Jane">
  <ContentDirectory>Content</ContentDirectory>
  <BuildDirectory>Build</BuildDirectory>
</Project>
"#;

pub const ASSETS: &str = r#"<Assets compress="true">
  <Asset name="ball">
    <Type>Texture</Type>
    <Source>ball.png</Source>
  </Asset>
  <Asset name="bounce">
    <Type>Audio</Type>
    <Source>sfx/bounce.wav</Source>
  </Asset>
  <Asset name="level">
    <Type>Data</Type>
    <Source>level.bin</Source>
  </Asset>
</Assets>
"#;

pub const SCENES: &str = r#"<Scenes compress="true">
  <Scene name="main"><Source>Main.xscene</Source></Scene>
</Scenes>
"#;

pub const SCRIPTS: &str = r#"<Scripts>
  <Script name="player"><Source>Player.lua</Source></Script>
  <Script name="enemy"><Source>Enemy.lua</Source></Script>
</Scripts>
"#;

/// A complete project in a temporary directory.
pub struct TestProject {
    pub dir: TempDir,
}

impl TestProject {
    /// Creates the Pong project with sources for every declared item.
    pub fn new() -> Self {
        let project = Self {
            dir: tempfile::tempdir().unwrap(),
        };
        project.write("Pong.xproj", PROJECT.as_bytes());
        project.write("Content/Assets.xml", ASSETS.as_bytes());
        project.write("Content/Scenes.xml", SCENES.as_bytes());
        project.write("Content/Scripts.xml", SCRIPTS.as_bytes());
        project.write("Content/Assets/ball.png", &png(32, 32));
        project.write("Content/Assets/sfx/bounce.wav", &wav(&[1, 2, 3, 4]));
        project.write("Content/Assets/level.bin", b"level-one");
        project.write("Content/Scenes/Main.xscene", b"<Scene><Entity name=\"ball\"/></Scene>");
        project.write("Content/Scripts/Player.lua", b"function update() end");
        project.write("Content/Scripts/Enemy.lua", b"function chase() end");
        project
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn descriptor(&self) -> PathBuf {
        self.root().join("Pong.xproj")
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root().join(rel)
    }

    pub fn write(&self, rel: &str, bytes: &[u8]) {
        let path = self.path(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, bytes).unwrap();
    }

    pub fn read(&self, rel: &str) -> Vec<u8> {
        std::fs::read(self.path(rel)).unwrap()
    }

    /// Every file under `Build/` and the cache file, keyed by relative path.
    pub fn snapshot(&self) -> BTreeMap<String, Vec<u8>> {
        let mut files = BTreeMap::new();
        collect(self.root(), &self.path("Build"), &mut files);
        let cache = self.path(".build_cache");
        if cache.exists() {
            files.insert(".build_cache".to_string(), std::fs::read(cache).unwrap());
        }
        files
    }
}

fn collect(root: &Path, dir: &Path, out: &mut BTreeMap<String, Vec<u8>>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect(root, &path, out);
        } else {
            let rel = path.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/");
            out.insert(rel, std::fs::read(&path).unwrap());
        }
    }
}

/// An all-zero 8-bit RGBA image.
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().unwrap();
        writer
            .write_image_data(&vec![0; 4 * (width * height) as usize])
            .unwrap();
    }
    out
}

/// A mono 16-bit 22 050 Hz PCM WAVE file whose data chunk is `samples`.
pub fn wav(samples: &[u8]) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 22050,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut out = Cursor::new(Vec::new());
    let mut writer = hound::WavWriter::new(&mut out, spec).unwrap();
    for pair in samples.chunks_exact(2) {
        writer
            .write_sample(i16::from_le_bytes([pair[0], pair[1]]))
            .unwrap();
    }
    writer.finalize().unwrap();
    out.into_inner()
}

/// Wraps a processor and records every source it is asked to process.
pub struct Recording {
    inner: Arc<dyn Processor>,
    calls: Arc<Mutex<Vec<PathBuf>>>,
}

impl Processor for Recording {
    fn process(&self, source: &Path) -> Result<Processed, ProcessError> {
        self.calls.lock().unwrap().push(source.to_path_buf());
        self.inner.process(source)
    }
}

/// Default tools whose processors record their calls into the returned log.
pub fn recording_tools() -> (Toolset, Arc<Mutex<Vec<PathBuf>>>) {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let bundled: [(AssetKind, Arc<dyn Processor>); 4] = [
        (AssetKind::Texture, Arc::new(TextureProcessor)),
        (AssetKind::Audio, Arc::new(AudioProcessor)),
        (AssetKind::Data, Arc::new(DataProcessor)),
        (AssetKind::Text, Arc::new(TextProcessor)),
    ];
    let mut processors = ProcessorSet::new();
    for (kind, inner) in bundled {
        processors = processors.with(
            kind,
            Arc::new(Recording {
                inner,
                calls: Arc::clone(&calls),
            }),
        );
    }
    let tools = Toolset {
        processors,
        ..Toolset::new()
    };
    (tools, calls)
}

/// File names of the recorded sources, sorted.
pub fn called(calls: &Mutex<Vec<PathBuf>>) -> Vec<String> {
    let mut names: Vec<String> = calls
        .lock()
        .unwrap()
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
