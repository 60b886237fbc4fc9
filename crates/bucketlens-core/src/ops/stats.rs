//! Prefix stats poll and invalidation.

use tracing::info;

use bucketlens_model::PrefixStatsView;

use crate::error::BrowserError;
use crate::provider::BucketLens;
use crate::stats::PrefixKey;
use crate::utils::normalize_prefix;

impl BucketLens {
    /// Current aggregate state for a prefix; `{ready:false}` when never scheduled.
    pub fn handle_get_prefix_stats(
        &self,
        store: &str,
        bucket: &str,
        prefix: &str,
    ) -> Result<PrefixStatsView, BrowserError> {
        let key = self.prefix_key(store, bucket, prefix)?;
        Ok(self
            .stats
            .get(&key)
            .map_or_else(PrefixStatsView::unscheduled, |entry| entry.to_view()))
    }

    /// Drop the cached aggregate for a prefix and cancel its computation.
    ///
    /// Returns whether an entry existed. The next listing reschedules it.
    pub fn handle_invalidate_prefix_stats(
        &self,
        store: &str,
        bucket: &str,
        prefix: &str,
    ) -> Result<bool, BrowserError> {
        let key = self.prefix_key(store, bucket, prefix)?;
        let removed = self.stats.invalidate(&key);
        info!(
            store = %key.store,
            bucket = %key.bucket,
            prefix = %key.prefix,
            removed,
            "prefix stats invalidated"
        );
        Ok(removed)
    }

    fn prefix_key(&self, store: &str, bucket: &str, prefix: &str) -> Result<PrefixKey, BrowserError> {
        if bucket.is_empty() || prefix.is_empty() {
            return Err(BrowserError::invalid_argument(
                "bucket and prefix query params are required",
            ));
        }
        let config = self
            .registry
            .find(store)
            .ok_or_else(|| BrowserError::StoreNotFound {
                name: store.to_owned(),
            })?;
        Ok(PrefixKey::new(config.name, bucket, normalize_prefix(prefix)))
    }
}
