//! Core of the BucketLens object-store browser.
//!
//! This crate resolves per-request clients for configured S3-compatible
//! stores, keeps a background-computed cache of folder aggregates, streams
//! folder archives, and buffers uploads so they carry an exact length.
//!
//! # Architecture
//!
//! ```text
//! BucketLens (ops::* handle_* methods)
//!        |
//!        +--> ClientResolver --> StoreRegistry
//!        |          |
//!        |          v
//!        |    ClientFactory --> StoreClient (S3StoreClient | MemoryStore)
//!        |
//!        +--> PrefixStatsCache (bounded background walks)
//!        +--> ArchiveStreamer (zip over a bounded channel)
//!        +--> UploadBuffer (scoped temp files)
//! ```

pub mod archive;
pub mod config;
pub mod error;
mod ops;
pub mod provider;
pub mod registry;
pub mod resolver;
pub mod stats;
pub mod store;
pub mod upload;
pub mod utils;

pub use config::BrowserConfig;
pub use error::{BrowserError, StoreError};
pub use provider::BucketLens;
