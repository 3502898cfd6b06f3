//! Shared foundational types used across the XPak content pipeline.
//!
//! This crate provides the SHA-256 content hash used for change detection and
//! the asset kind enumeration shared by manifests and processors.

#![warn(missing_docs)]

pub mod hash;
pub mod kind;

pub use hash::{ContentHash, ParseHashError, HASH_CHUNK_SIZE};
pub use kind::{AssetKind, ParseAssetKindError};
