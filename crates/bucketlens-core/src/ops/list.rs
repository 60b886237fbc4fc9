//! Shallow listing with folder aggregates.
//!
//! One delimited listing call answers the request. Files under the prefix
//! come back directly; each sub-prefix comes back with its cached aggregate
//! when one is ready, and otherwise as a provisional folder while the
//! aggregate is scheduled in the background.

use tracing::debug;

use bucketlens_model::ListingEntry;

use crate::error::BrowserError;
use crate::provider::BucketLens;
use crate::stats::{ComputationError, PrefixKey, compute_prefix_totals};
use crate::store::ListObjectsRequest;
use crate::utils::normalize_prefix;

impl BucketLens {
    /// List the files and sub-prefixes directly under `prefix`.
    pub async fn handle_list_objects(
        &self,
        store: &str,
        bucket: &str,
        prefix: &str,
    ) -> Result<Vec<ListingEntry>, BrowserError> {
        let prefix = normalize_prefix(prefix);
        let (resolved, _) = self.resolver.resolve(store)?;
        let page = resolved
            .client
            .list_objects_page(&ListObjectsRequest::shallow(bucket, &prefix))
            .await?;

        let mut entries = Vec::with_capacity(page.objects.len() + page.common_prefixes.len());
        for object in page.objects {
            if object.key == prefix {
                continue;
            }
            entries.push(ListingEntry::file(object.key, object.size, object.last_modified));
        }

        let mut scheduled = 0usize;
        for common_prefix in page.common_prefixes {
            let key = PrefixKey::new(resolved.store_name(), bucket, common_prefix.as_str());
            let cached = self.stats.get(&key);
            match cached.as_ref().and_then(|entry| entry.totals()) {
                Some(totals) => entries.push(ListingEntry::folder(
                    common_prefix,
                    totals.total_size,
                    totals.last_modified,
                )),
                None => {
                    if cached.is_none() && self.schedule_prefix_stats(key) {
                        scheduled += 1;
                    }
                    entries.push(ListingEntry::provisional_folder(common_prefix));
                }
            }
        }

        debug!(
            store = %resolved.store_name(),
            bucket,
            prefix = %prefix,
            entries = entries.len(),
            scheduled,
            "listed objects"
        );
        Ok(entries)
    }

    /// Schedule the background aggregate for `key`.
    ///
    /// The task resolves its own client by store name, so it does not borrow
    /// anything from the request that triggered it. A store deleted after
    /// the listing resolved it leaves no entry behind.
    pub(crate) fn schedule_prefix_stats(&self, key: PrefixKey) -> bool {
        let resolver = self.resolver.clone();
        let task_key = key.clone();
        self.stats.ensure_scheduled(key, move || async move {
            let (resolved, _) = resolver.resolve(&task_key.store).map_err(|err| match err {
                BrowserError::StoreNotFound { .. } => ComputationError::StoreRemoved,
                other => ComputationError::Failed(other.to_string()),
            })?;
            compute_prefix_totals(resolved.client.as_ref(), &task_key.bucket, &task_key.prefix)
                .await
                .map_err(ComputationError::from)
        })
    }
}
