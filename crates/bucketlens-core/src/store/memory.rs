//! In-process object store.
//!
//! [`MemoryStore`] keeps each bucket as an ordered key map so listings come
//! back in key order with real pagination and delimiter roll-up, the same
//! way an S3 endpoint answers `ListObjectsV2`. It counts calls and records
//! every write, and can be told to fail listings or reads, which makes it
//! the stub store for the cache, archive and upload paths.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::trace;

use bucketlens_model::StoreConfig;

use super::{ListObjectsRequest, ObjectPage, ObjectReader, ObjectSummary, StoreClient};
use crate::error::StoreError;
use crate::resolver::{ClientDescriptor, ClientFactory};
use crate::upload::BufferedUpload;
use crate::utils::{decode_continuation_token, encode_continuation_token};

/// Default number of entries per listing page, matching S3.
const DEFAULT_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    reported_size: Option<i64>,
    last_modified: DateTime<Utc>,
}

/// One recorded `put_object` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutRecord {
    /// Target bucket.
    pub bucket: String,
    /// Target key.
    pub key: String,
    /// The content length declared by the caller.
    pub declared_length: u64,
    /// Path of the buffered file the body was read from.
    pub source_path: PathBuf,
}

/// In-process [`StoreClient`].
#[derive(Debug)]
pub struct MemoryStore {
    buckets: DashMap<String, BTreeMap<String, StoredObject>>,
    page_size: usize,
    list_delay: Option<Duration>,
    list_calls: AtomicUsize,
    open_calls: AtomicUsize,
    puts: Mutex<Vec<PutRecord>>,
    failing_listings: DashMap<String, String>,
    failing_reads: DashMap<String, String>,
    fail_puts: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buckets: DashMap::new(),
            page_size: DEFAULT_PAGE_SIZE,
            list_delay: None,
            list_calls: AtomicUsize::new(0),
            open_calls: AtomicUsize::new(0),
            puts: Mutex::new(Vec::new()),
            failing_listings: DashMap::new(),
            failing_reads: DashMap::new(),
            fail_puts: AtomicBool::new(false),
        }
    }

    /// Limit listing pages to `page_size` entries (objects plus prefixes).
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Delay every listing call, to hold computations in flight.
    #[must_use]
    pub fn with_list_delay(mut self, delay: Duration) -> Self {
        self.list_delay = Some(delay);
        self
    }

    /// Create a bucket if it does not exist.
    pub fn create_bucket(&self, bucket: &str) {
        self.buckets.entry(bucket.to_owned()).or_default();
    }

    /// Store an object, creating the bucket if needed.
    pub fn insert_object(&self, bucket: &str, key: &str, data: impl Into<Bytes>) {
        let data = data.into();
        let size = i64::try_from(data.len()).ok();
        self.insert_object_with(bucket, key, data, size, Utc::now());
    }

    /// Store an object with an explicit reported size and modification time.
    ///
    /// A `None` size makes listings report the object without one.
    pub fn insert_object_with(
        &self,
        bucket: &str,
        key: &str,
        data: impl Into<Bytes>,
        reported_size: Option<i64>,
        last_modified: DateTime<Utc>,
    ) {
        self.buckets.entry(bucket.to_owned()).or_default().insert(
            key.to_owned(),
            StoredObject {
                data: data.into(),
                reported_size,
                last_modified,
            },
        );
    }

    /// Content of a stored object.
    #[must_use]
    pub fn object_data(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.buckets
            .get(bucket)
            .and_then(|objects| objects.get(key).map(|o| o.data.clone()))
    }

    /// Make every listing of `bucket` fail with `message`.
    pub fn fail_listings(&self, bucket: &str, message: &str) {
        self.failing_listings
            .insert(bucket.to_owned(), message.to_owned());
    }

    /// Make reads of `key` (in any bucket) fail with `message`.
    pub fn fail_reads(&self, key: &str, message: &str) {
        self.failing_reads.insert(key.to_owned(), message.to_owned());
    }

    /// Make every `put_object` fail after it has been recorded.
    pub fn fail_puts(&self) {
        self.fail_puts.store(true, Ordering::SeqCst);
    }

    /// Number of listing calls served so far.
    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Number of object reads opened so far.
    #[must_use]
    pub fn open_calls(&self) -> usize {
        self.open_calls.load(Ordering::SeqCst)
    }

    /// Every `put_object` call seen so far.
    #[must_use]
    pub fn puts(&self) -> Vec<PutRecord> {
        self.puts.lock().clone()
    }

    fn list_page(&self, request: &ListObjectsRequest) -> Result<ObjectPage, StoreError> {
        let objects = self
            .buckets
            .get(&request.bucket)
            .ok_or_else(|| StoreError::NoSuchBucket {
                bucket: request.bucket.clone(),
            })?;
        let start_after = request
            .continuation_token
            .as_deref()
            .map(decode_continuation_token)
            .transpose()?;

        let prefix = request.prefix.as_str();
        let mut page = ObjectPage::default();
        let mut emitted = 0usize;
        let mut last_emitted: Option<String> = None;

        for (key, object) in objects.range::<str, _>((Bound::Included(prefix), Bound::Unbounded)) {
            if !key.starts_with(prefix) {
                break;
            }
            if let Some(after) = start_after.as_deref() {
                if key.as_str() <= after {
                    continue;
                }
            }

            let rolled_up = request.delimiter.as_deref().and_then(|delimiter| {
                let rest = &key[prefix.len()..];
                rest.find(delimiter)
                    .map(|pos| format!("{prefix}{}", &rest[..pos + delimiter.len()]))
            });

            if let Some(common_prefix) = rolled_up {
                let already_emitted = page.common_prefixes.last() == Some(&common_prefix)
                    || start_after
                        .as_deref()
                        .is_some_and(|after| after.starts_with(common_prefix.as_str()));
                if already_emitted {
                    continue;
                }
                if emitted == self.page_size {
                    page.is_truncated = true;
                    break;
                }
                last_emitted = Some(common_prefix.clone());
                page.common_prefixes.push(common_prefix);
            } else {
                if emitted == self.page_size {
                    page.is_truncated = true;
                    break;
                }
                last_emitted = Some(key.clone());
                page.objects.push(ObjectSummary {
                    key: key.clone(),
                    size: object.reported_size,
                    last_modified: Some(object.last_modified),
                });
            }
            emitted += 1;
        }

        if page.is_truncated {
            page.next_continuation_token = last_emitted.as_deref().map(encode_continuation_token);
        }
        Ok(page)
    }
}

#[async_trait]
impl StoreClient for MemoryStore {
    async fn list_objects_page(
        &self,
        request: &ListObjectsRequest,
    ) -> Result<ObjectPage, StoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.list_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = self.failing_listings.get(&request.bucket) {
            return Err(StoreError::service("ListObjectsV2", message.value()));
        }
        let page = self.list_page(request)?;
        trace!(
            bucket = %request.bucket,
            prefix = %request.prefix,
            objects = page.objects.len(),
            prefixes = page.common_prefixes.len(),
            "memory store listing"
        );
        Ok(page)
    }

    async fn open_object(&self, bucket: &str, key: &str) -> Result<ObjectReader, StoreError> {
        self.open_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.failing_reads.get(key) {
            return Err(StoreError::service("GetObject", message.value()));
        }
        let data = self
            .object_data(bucket, key)
            .ok_or_else(|| StoreError::NoSuchKey {
                bucket: bucket.to_owned(),
                key: key.to_owned(),
            })?;
        Ok(Box::pin(std::io::Cursor::new(data)))
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: &BufferedUpload,
    ) -> Result<(), StoreError> {
        self.puts.lock().push(PutRecord {
            bucket: bucket.to_owned(),
            key: key.to_owned(),
            declared_length: body.len(),
            source_path: body.path().to_path_buf(),
        });
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StoreError::service("PutObject", "injected failure"));
        }
        if !self.buckets.contains_key(bucket) {
            return Err(StoreError::NoSuchBucket {
                bucket: bucket.to_owned(),
            });
        }
        let data = tokio::fs::read(body.path()).await?;
        self.insert_object(bucket, key, data);
        Ok(())
    }
}

/// [`ClientFactory`] handing out one shared [`MemoryStore`] per store name.
#[derive(Debug, Default)]
pub struct MemoryClientFactory {
    stores: DashMap<String, Arc<MemoryStore>>,
}

impl MemoryClientFactory {
    /// Create a factory with no stores yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a prepared store under `name`.
    pub fn insert(&self, name: &str, store: MemoryStore) -> Arc<MemoryStore> {
        let store = Arc::new(store);
        self.stores.insert(name.to_owned(), Arc::clone(&store));
        store
    }

    /// The store registered under `name`, created empty on first use.
    pub fn store(&self, name: &str) -> Arc<MemoryStore> {
        Arc::clone(
            self.stores
                .entry(name.to_owned())
                .or_insert_with(|| Arc::new(MemoryStore::new()))
                .value(),
        )
    }
}

impl ClientFactory for MemoryClientFactory {
    fn build(&self, descriptor: &ClientDescriptor, _config: &StoreConfig) -> Arc<dyn StoreClient> {
        self.store(&descriptor.store_name)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use tokio::io::AsyncReadExt;

    use super::*;

    fn populated() -> MemoryStore {
        let store = MemoryStore::new();
        for key in [
            "photos/2024/jan/a.jpg",
            "photos/2024/jan/b.jpg",
            "photos/2024/feb/c.jpg",
            "photos/2025/d.jpg",
            "photos/cover.jpg",
            "root.txt",
        ] {
            store.insert_object("b", key, b"x".to_vec());
        }
        store
    }

    #[tokio::test]
    async fn test_should_roll_up_common_prefixes() {
        let store = populated();
        let page = store
            .list_objects_page(&ListObjectsRequest::shallow("b", "photos/"))
            .await
            .expect("listing should succeed");
        assert_eq!(page.common_prefixes, vec!["photos/2024/", "photos/2025/"]);
        let keys: Vec<_> = page.objects.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["photos/cover.jpg"]);
        assert!(!page.is_truncated);
    }

    #[tokio::test]
    async fn test_should_paginate_prefixes_without_repeating_them() {
        let store = populated().with_page_size(1);
        let mut request = ListObjectsRequest::shallow("b", "photos/");
        let mut seen = Vec::new();
        loop {
            let page = store
                .list_objects_page(&request)
                .await
                .expect("listing should succeed");
            seen.extend(page.common_prefixes.clone());
            seen.extend(page.objects.iter().map(|o| o.key.clone()));
            if !page.is_truncated {
                break;
            }
            request.continuation_token = page.next_continuation_token;
        }
        assert_eq!(seen, vec!["photos/2024/", "photos/2025/", "photos/cover.jpg"]);
        assert_eq!(store.list_calls(), 3);
    }

    #[tokio::test]
    async fn test_should_report_unknown_sizes() {
        let store = MemoryStore::new();
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().expect("valid date");
        store.insert_object_with("b", "k", b"abc".to_vec(), None, ts);
        let page = store
            .list_objects_page(&ListObjectsRequest::recursive("b", ""))
            .await
            .expect("listing should succeed");
        assert_eq!(page.objects[0].size, None);
        assert_eq!(page.objects[0].last_modified, Some(ts));
    }

    #[tokio::test]
    async fn test_should_read_object_content() {
        let store = populated();
        let mut reader = store
            .open_object("b", "root.txt")
            .await
            .expect("object should exist");
        let mut content = Vec::new();
        reader
            .read_to_end(&mut content)
            .await
            .expect("read should succeed");
        assert_eq!(content, b"x");
        assert_eq!(store.open_calls(), 1);
    }

    #[tokio::test]
    async fn test_should_fail_injected_reads_and_listings() {
        let store = populated();
        store.fail_reads("root.txt", "boom");
        store.fail_listings("b", "AccessDenied");
        assert!(store.open_object("b", "root.txt").await.is_err());
        let err = store
            .list_objects_page(&ListObjectsRequest::recursive("b", ""))
            .await
            .expect_err("listing should fail");
        assert!(err.to_string().contains("AccessDenied"));
    }

    #[test]
    fn test_should_share_store_per_name() {
        let factory = MemoryClientFactory::new();
        let a = factory.store("minio");
        a.create_bucket("b");
        let again = factory.store("minio");
        assert!(Arc::ptr_eq(&a, &again));
        assert!(!Arc::ptr_eq(&a, &factory.store("other")));
    }
}
