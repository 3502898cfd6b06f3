//! Source processors.
//!
//! A [`Processor`] turns one source file into a payload plus flat string
//! metadata. The bundled processors validate the whole file with the `png`
//! and `hound` decoders and describe it in the metadata.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use xpak_common::AssetKind;
use xpak_pak::Metadata;

/// Output of a processor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Processed {
    /// Bytes to pack. An empty payload produces no artifact.
    pub payload: Vec<u8>,
    /// Key/value description written to the sidecar when non-empty.
    pub metadata: Metadata,
}

/// Errors raised by a processor.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// The source could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The source file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The source is not a well-formed file of the declared kind.
    #[error("{path}: {reason}")]
    Format {
        /// The source file.
        path: PathBuf,
        /// What is malformed.
        reason: String,
    },

    /// The source is well-formed but uses a feature the pipeline rejects.
    #[error("{path}: unsupported {reason}")]
    Unsupported {
        /// The source file.
        path: PathBuf,
        /// What is unsupported.
        reason: String,
    },
}

impl ProcessError {
    fn format(path: &Path, reason: impl Into<String>) -> Self {
        Self::Format {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    fn unsupported(path: &Path, reason: impl Into<String>) -> Self {
        Self::Unsupported {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

/// Converts a source file of one asset kind into a packed payload.
///
/// Implementations must be deterministic and safe to call from several
/// worker threads at once.
pub trait Processor: Send + Sync {
    /// Processes the file at `source`.
    fn process(&self, source: &Path) -> Result<Processed, ProcessError>;
}

fn read_source(path: &Path) -> Result<Vec<u8>, ProcessError> {
    std::fs::read(path).map_err(|e| ProcessError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

/// PNG textures. Emits `width`, `height`, `bit_depth` and `color_type`.
///
/// The whole image is decoded once so that truncated data and bad chunk
/// CRCs are caught here rather than at load time.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextureProcessor;

impl Processor for TextureProcessor {
    fn process(&self, source: &Path) -> Result<Processed, ProcessError> {
        let bytes = read_source(source)?;
        let invalid = |e: png::DecodingError| ProcessError::format(source, e.to_string());

        let decoder = png::Decoder::new(Cursor::new(bytes.as_slice()));
        let mut reader = decoder.read_info().map_err(invalid)?;
        let info = reader.info();
        let metadata = Metadata::from([
            ("width".to_string(), info.width.to_string()),
            ("height".to_string(), info.height.to_string()),
            ("bit_depth".to_string(), (info.bit_depth as u8).to_string()),
            ("color_type".to_string(), (info.color_type as u8).to_string()),
        ]);

        let mut frame = vec![0; reader.output_buffer_size()];
        reader.next_frame(&mut frame).map_err(invalid)?;
        reader.finish().map_err(invalid)?;

        Ok(Processed {
            payload: bytes,
            metadata,
        })
    }
}

/// RIFF/WAVE integer PCM audio, mono or stereo. The payload is the sample
/// data in file order; emits `channels`, `sample_rate` and `bits_per_sample`.
#[derive(Debug, Default, Clone, Copy)]
pub struct AudioProcessor;

impl Processor for AudioProcessor {
    fn process(&self, source: &Path) -> Result<Processed, ProcessError> {
        let bytes = read_source(source)?;
        let wav_error = |e: hound::Error| match e {
            hound::Error::Unsupported => ProcessError::unsupported(source, "WAVE encoding"),
            other => ProcessError::format(source, other.to_string()),
        };

        let mut reader = hound::WavReader::new(Cursor::new(bytes.as_slice())).map_err(wav_error)?;
        let spec = reader.spec();
        if spec.sample_format != hound::SampleFormat::Int {
            return Err(ProcessError::unsupported(
                source,
                "floating-point samples (only integer PCM)",
            ));
        }
        if spec.channels == 0 || spec.channels > 2 {
            return Err(ProcessError::unsupported(
                source,
                format!("channel layout with {} channels", spec.channels),
            ));
        }
        if !matches!(spec.bits_per_sample, 8 | 16 | 24 | 32) {
            return Err(ProcessError::unsupported(
                source,
                format!("{}-bit samples", spec.bits_per_sample),
            ));
        }

        // Samples are re-encoded exactly as stored: little endian, 8-bit unsigned.
        let width = usize::from(spec.bits_per_sample / 8);
        let mut payload = Vec::with_capacity(reader.len() as usize * width);
        for sample in reader.samples::<i32>() {
            let sample = sample.map_err(wav_error)?;
            let stored = if width == 1 { sample + 128 } else { sample };
            payload.extend_from_slice(&stored.to_le_bytes()[..width]);
        }

        let metadata = Metadata::from([
            ("channels".to_string(), spec.channels.to_string()),
            ("sample_rate".to_string(), spec.sample_rate.to_string()),
            (
                "bits_per_sample".to_string(),
                spec.bits_per_sample.to_string(),
            ),
        ]);
        Ok(Processed { payload, metadata })
    }
}

/// Opaque data, packed verbatim without metadata.
#[derive(Debug, Default, Clone, Copy)]
pub struct DataProcessor;

impl Processor for DataProcessor {
    fn process(&self, source: &Path) -> Result<Processed, ProcessError> {
        Ok(Processed {
            payload: read_source(source)?,
            metadata: Metadata::new(),
        })
    }
}

/// UTF-8 text such as scenes and scripts.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextProcessor;

impl Processor for TextProcessor {
    fn process(&self, source: &Path) -> Result<Processed, ProcessError> {
        let bytes = read_source(source)?;
        if let Err(e) = std::str::from_utf8(&bytes) {
            return Err(ProcessError::format(
                source,
                format!("invalid UTF-8 at byte {}", e.valid_up_to()),
            ));
        }
        Ok(Processed {
            payload: bytes,
            metadata: Metadata::new(),
        })
    }
}

/// One processor per [`AssetKind`].
#[derive(Clone)]
pub struct ProcessorSet {
    texture: Arc<dyn Processor>,
    audio: Arc<dyn Processor>,
    data: Arc<dyn Processor>,
    text: Arc<dyn Processor>,
}

impl ProcessorSet {
    /// Returns the set of bundled processors.
    pub fn new() -> Self {
        Self {
            texture: Arc::new(TextureProcessor),
            audio: Arc::new(AudioProcessor),
            data: Arc::new(DataProcessor),
            text: Arc::new(TextProcessor),
        }
    }

    /// Replaces the processor used for `kind`.
    pub fn with(mut self, kind: AssetKind, processor: Arc<dyn Processor>) -> Self {
        *self.slot(kind) = processor;
        self
    }

    /// Returns the processor for `kind`.
    pub fn get(&self, kind: AssetKind) -> &dyn Processor {
        match kind {
            AssetKind::Texture => self.texture.as_ref(),
            AssetKind::Audio => self.audio.as_ref(),
            AssetKind::Data => self.data.as_ref(),
            AssetKind::Text => self.text.as_ref(),
        }
    }

    /// Processes `source` with the processor for `kind`.
    pub fn process(&self, kind: AssetKind, source: &Path) -> Result<Processed, ProcessError> {
        self.get(kind).process(source)
    }

    fn slot(&mut self, kind: AssetKind) -> &mut Arc<dyn Processor> {
        match kind {
            AssetKind::Texture => &mut self.texture,
            AssetKind::Audio => &mut self.audio,
            AssetKind::Data => &mut self.data,
            AssetKind::Text => &mut self.text,
        }
    }
}

impl Default for ProcessorSet {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ProcessorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessorSet").finish_non_exhaustive()
    }
}
