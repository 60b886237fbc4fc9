//! Buffered uploads.

use tokio::io::AsyncRead;
use tracing::{info, warn};

use bucketlens_model::UploadResult;

use crate::error::BrowserError;
use crate::provider::BucketLens;
use crate::utils::upload_object_key;

impl BucketLens {
    /// Buffer `body` to disk, then write it to `prefix/file_name` with an
    /// explicit content length.
    ///
    /// The temporary file is removed before this returns, whether the
    /// write succeeded or not.
    pub async fn handle_upload_object<R>(
        &self,
        store: &str,
        bucket: &str,
        prefix: &str,
        file_name: &str,
        body: R,
    ) -> Result<UploadResult, BrowserError>
    where
        R: AsyncRead + Unpin,
    {
        let key = upload_object_key(prefix, file_name)
            .ok_or_else(|| BrowserError::invalid_argument("a non-empty file name is required"))?;
        let (resolved, _) = self.resolver.resolve(store)?;

        let upload = self.uploads.capture(body).await?;
        let size = upload.len();
        let result = resolved.client.put_object(bucket, &key, &upload).await;
        if let Err(err) = upload.close() {
            warn!(error = %err, "failed to remove upload buffer");
        }
        result?;

        info!(store = %resolved.store_name(), bucket, key = %key, size, "object uploaded");
        Ok(UploadResult { key, size })
    }
}
