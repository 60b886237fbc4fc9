//! Service configuration.
//!
//! Provides [`BrowserConfig`], loaded from environment variables with
//! [`BrowserConfig::from_env`].

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// Default copy-buffer size for archive entries (64 KiB).
pub const DEFAULT_ARCHIVE_CHUNK_SIZE: usize = 65_536;

/// Default in-memory request body ceiling (100 MiB).
pub const DEFAULT_MAX_UPLOAD_SIZE: usize = 104_857_600;

/// BucketLens configuration.
///
/// # Examples
///
/// ```
/// use bucketlens_core::config::BrowserConfig;
///
/// let config = BrowserConfig::default();
/// assert_eq!(config.listen, "0.0.0.0:8081");
/// assert_eq!(config.stats_max_concurrency, 8);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct BrowserConfig {
    /// Bind address (e.g. `"0.0.0.0:8081"`).
    #[builder(default = String::from("0.0.0.0:8081"))]
    pub listen: String,

    /// Path of the persisted store registry.
    #[builder(default = PathBuf::from("stores.json"))]
    pub stores_file: PathBuf,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,

    /// Maximum request body size accepted before multipart parsing.
    #[builder(default = DEFAULT_MAX_UPLOAD_SIZE)]
    pub max_upload_size: usize,

    /// Directory for upload buffer files; the system temp dir when unset.
    #[builder(default)]
    pub upload_temp_dir: Option<PathBuf>,

    /// Maximum number of prefix stats computations running at once.
    #[builder(default = 8)]
    pub stats_max_concurrency: usize,

    /// Copy-buffer size used by the archive streamer.
    #[builder(default = DEFAULT_ARCHIVE_CHUNK_SIZE)]
    pub archive_chunk_size: usize,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            listen: String::from("0.0.0.0:8081"),
            stores_file: PathBuf::from("stores.json"),
            log_level: String::from("info"),
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
            upload_temp_dir: None,
            stats_max_concurrency: 8,
            archive_chunk_size: DEFAULT_ARCHIVE_CHUNK_SIZE,
        }
    }
}

impl BrowserConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `BUCKETLENS_LISTEN` | `0.0.0.0:8081` |
    /// | `BUCKETLENS_STORES_FILE` | `stores.json` |
    /// | `LOG_LEVEL` | `info` |
    /// | `MAX_UPLOAD_SIZE` | `104857600` |
    /// | `UPLOAD_TEMP_DIR` | *(system temp dir)* |
    /// | `STATS_MAX_CONCURRENCY` | `8` |
    /// | `ARCHIVE_CHUNK_SIZE` | `65536` |
    ///
    /// Unparseable or zero numeric values keep the default.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(v) = lookup("BUCKETLENS_LISTEN") {
            config.listen = v;
        }
        if let Some(v) = lookup("BUCKETLENS_STORES_FILE") {
            config.stores_file = PathBuf::from(v);
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            config.log_level = v;
        }
        if let Some(n) = lookup("MAX_UPLOAD_SIZE").and_then(|v| parse_positive(&v)) {
            config.max_upload_size = n;
        }
        if let Some(v) = lookup("UPLOAD_TEMP_DIR").filter(|v| !v.is_empty()) {
            config.upload_temp_dir = Some(PathBuf::from(v));
        }
        if let Some(n) = lookup("STATS_MAX_CONCURRENCY").and_then(|v| parse_positive(&v)) {
            config.stats_max_concurrency = n;
        }
        if let Some(n) = lookup("ARCHIVE_CHUNK_SIZE").and_then(|v| parse_positive(&v)) {
            config.archive_chunk_size = n;
        }

        config
    }
}

fn parse_positive(value: &str) -> Option<usize> {
    value.trim().parse::<usize>().ok().filter(|n| *n > 0)
}
