//! Incremental content builds for XPak projects.
//!
//! A [`Project`] loads the project descriptor, the checksum store and the
//! asset, scene and script [`Manifest`]s. Building classifies every source by
//! content hash, sends new and changed sources through a [`Processor`] on a
//! rayon pool, and writes packed containers under the build directory.

#![warn(missing_docs)]

mod assets;
mod bundle;
pub mod error;
pub mod manifest;
pub mod processor;
pub mod project;
pub mod report;
pub mod tools;

pub use error::BuildError;
pub use manifest::Manifest;
pub use processor::{
    AudioProcessor, DataProcessor, ProcessError, Processed, Processor, ProcessorSet,
    TextProcessor, TextureProcessor,
};
pub use project::Project;
pub use report::{BuildReport, ItemFailure, ManifestReport};
pub use tools::Toolset;
