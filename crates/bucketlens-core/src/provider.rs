//! The BucketLens provider.
//!
//! [`BucketLens`] owns the registry, the client resolver, the prefix stats
//! cache and the archive and upload helpers. Endpoint logic lives in the
//! [`crate::ops`] submodules as `handle_*` methods on this type; the server
//! binary bridges them to HTTP.

use std::sync::Arc;

use crate::archive::ArchiveStreamer;
use crate::config::BrowserConfig;
use crate::registry::StoreRegistry;
use crate::resolver::{ClientFactory, ClientResolver, S3ClientFactory};
use crate::stats::PrefixStatsCache;
use crate::upload::UploadBuffer;

/// Shared service state. Cloning is cheap.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use bucketlens_core::BucketLens;
/// use bucketlens_core::config::BrowserConfig;
/// use bucketlens_core::registry::StoreRegistry;
///
/// let lens = BucketLens::new(
///     BrowserConfig::default(),
///     Arc::new(StoreRegistry::in_memory(Vec::new())),
/// );
/// assert!(lens.stats().is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct BucketLens {
    pub(crate) registry: Arc<StoreRegistry>,
    pub(crate) resolver: ClientResolver,
    pub(crate) stats: Arc<PrefixStatsCache>,
    pub(crate) archiver: ArchiveStreamer,
    pub(crate) uploads: UploadBuffer,
    pub(crate) config: Arc<BrowserConfig>,
}

impl BucketLens {
    /// Create a provider talking to real S3-compatible stores.
    #[must_use]
    pub fn new(config: BrowserConfig, registry: Arc<StoreRegistry>) -> Self {
        Self::with_factory(config, registry, Arc::new(S3ClientFactory))
    }

    /// Create a provider whose clients come from `factory`.
    #[must_use]
    pub fn with_factory(
        config: BrowserConfig,
        registry: Arc<StoreRegistry>,
        factory: Arc<dyn ClientFactory>,
    ) -> Self {
        Self {
            resolver: ClientResolver::new(Arc::clone(&registry), factory),
            stats: Arc::new(PrefixStatsCache::new(config.stats_max_concurrency)),
            archiver: ArchiveStreamer::new(config.archive_chunk_size),
            uploads: UploadBuffer::new(config.upload_temp_dir.clone()),
            registry,
            config: Arc::new(config),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &StoreRegistry {
        &self.registry
    }

    #[must_use]
    pub fn resolver(&self) -> &ClientResolver {
        &self.resolver
    }

    #[must_use]
    pub fn stats(&self) -> &PrefixStatsCache {
        &self.stats
    }

    #[must_use]
    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }
}
