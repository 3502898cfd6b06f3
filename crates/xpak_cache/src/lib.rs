//! Persistent build cache for incremental content builds.
//!
//! This crate provides the content-hash checksum store shared by every
//! manifest during a build, the streaming source hasher, and the rebuild
//! decision that classifies each source item as fresh or stale.

#![warn(missing_docs)]

pub mod error;
pub mod hasher;
pub mod store;

pub use error::CacheError;
pub use hasher::{Freshness, SourceHasher};
pub use store::{ChecksumStore, CACHE_FILE};
