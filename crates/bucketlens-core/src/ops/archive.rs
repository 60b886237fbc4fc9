//! Folder download.

use tracing::info;

use crate::archive::FolderArchive;
use crate::error::BrowserError;
use crate::provider::BucketLens;
use crate::store::list_all_objects;
use crate::utils::{archive_file_name, normalize_prefix};

impl BucketLens {
    /// Prepare a streamed ZIP of everything under `prefix`.
    ///
    /// Store resolution and the full listing happen before this returns, so
    /// those failures still reach the caller as errors. Once the returned
    /// body is being sent, a failure can only truncate it.
    pub async fn handle_download_folder(
        &self,
        store: &str,
        bucket: &str,
        prefix: &str,
    ) -> Result<FolderArchive, BrowserError> {
        let prefix = normalize_prefix(prefix);
        let (resolved, _) = self.resolver.resolve(store)?;
        let objects = list_all_objects(resolved.client.as_ref(), bucket, &prefix).await?;

        info!(
            store = %resolved.store_name(),
            bucket,
            prefix = %prefix,
            objects = objects.len(),
            "streaming folder archive"
        );
        let object_count = objects.len();
        let body = self
            .archiver
            .stream(resolved.client, bucket.to_owned(), objects);
        Ok(FolderArchive {
            file_name: archive_file_name(&prefix),
            object_count,
            body,
        })
    }
}
