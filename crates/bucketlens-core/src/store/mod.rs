//! The backing store seam.
//!
//! [`StoreClient`] is the narrow set of object-store calls the browser core
//! needs: one listing page, one object read stream, one length-declared
//! write. [`S3StoreClient`](s3::S3StoreClient) speaks to real S3-compatible
//! endpoints; [`MemoryStore`](memory::MemoryStore) is an in-process store
//! with call counters used by tests and local runs.

pub mod memory;
pub mod s3;

use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::io::AsyncRead;
use tracing::trace;

use crate::error::StoreError;
use crate::upload::BufferedUpload;

pub use memory::{MemoryClientFactory, MemoryStore};
pub use s3::S3StoreClient;

/// A readable object body.
pub type ObjectReader = Pin<Box<dyn AsyncRead + Send>>;

/// Parameters of a single `ListObjectsV2` page request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListObjectsRequest {
    /// Bucket to list.
    pub bucket: String,
    /// Key prefix to list under.
    pub prefix: String,
    /// Roll keys up to this delimiter into common prefixes.
    pub delimiter: Option<String>,
    /// Token from the previous page.
    pub continuation_token: Option<String>,
}

impl ListObjectsRequest {
    /// One level under `prefix`, sub-prefixes rolled up at `/`.
    #[must_use]
    pub fn shallow(bucket: &str, prefix: &str) -> Self {
        Self {
            bucket: bucket.to_owned(),
            prefix: prefix.to_owned(),
            delimiter: Some("/".to_owned()),
            continuation_token: None,
        }
    }

    /// Every key under `prefix`, no delimiter.
    #[must_use]
    pub fn recursive(bucket: &str, prefix: &str) -> Self {
        Self {
            bucket: bucket.to_owned(),
            prefix: prefix.to_owned(),
            delimiter: None,
            continuation_token: None,
        }
    }
}

/// One listed object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    /// Full object key.
    pub key: String,
    /// Size in bytes, when the store reports one.
    pub size: Option<i64>,
    /// Last modification time, when the store reports one.
    pub last_modified: Option<DateTime<Utc>>,
}

/// One page of a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectPage {
    /// Objects on this page.
    pub objects: Vec<ObjectSummary>,
    /// Rolled-up sub-prefixes on this page (only with a delimiter).
    pub common_prefixes: Vec<String>,
    /// Whether more pages follow.
    pub is_truncated: bool,
    /// Token for the next page.
    pub next_continuation_token: Option<String>,
}

/// Object-store operations used by the browser core.
#[async_trait]
pub trait StoreClient: Send + Sync + std::fmt::Debug {
    /// Fetch a single listing page.
    async fn list_objects_page(
        &self,
        request: &ListObjectsRequest,
    ) -> Result<ObjectPage, StoreError>;

    /// Open a read stream over an object's content.
    async fn open_object(&self, bucket: &str, key: &str) -> Result<ObjectReader, StoreError>;

    /// Write a buffered upload with an explicit content length of `body.len()`.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: &BufferedUpload,
    ) -> Result<(), StoreError>;
}

/// Follow a listing's continuation tokens, handing each page to `visit`.
///
/// Pages are requested strictly one after another. A truncated page without
/// a continuation token is reported as an error instead of looping.
pub async fn for_each_page<F>(
    client: &dyn StoreClient,
    mut request: ListObjectsRequest,
    mut visit: F,
) -> Result<usize, StoreError>
where
    F: FnMut(ObjectPage) + Send,
{
    let mut pages = 0;
    loop {
        let page = client.list_objects_page(&request).await?;
        pages += 1;
        trace!(
            bucket = %request.bucket,
            prefix = %request.prefix,
            page = pages,
            objects = page.objects.len(),
            truncated = page.is_truncated,
            "listed page"
        );

        let next = page.next_continuation_token.clone();
        let truncated = page.is_truncated;
        visit(page);

        if !truncated {
            return Ok(pages);
        }
        match next {
            Some(token) => request.continuation_token = Some(token),
            None => {
                return Err(StoreError::service(
                    "ListObjectsV2",
                    "truncated page without a continuation token",
                ));
            }
        }
    }
}

/// List every object under `prefix`, following pagination to the end.
pub async fn list_all_objects(
    client: &dyn StoreClient,
    bucket: &str,
    prefix: &str,
) -> Result<Vec<ObjectSummary>, StoreError> {
    let mut objects = Vec::new();
    for_each_page(client, ListObjectsRequest::recursive(bucket, prefix), |page| {
        objects.extend(page.objects);
    })
    .await?;
    Ok(objects)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_should_list_all_objects_across_pages() {
        let store = MemoryStore::new().with_page_size(2);
        store.create_bucket("b");
        for i in 0..7 {
            store.insert_object("b", &format!("logs/{i}.txt"), vec![b'x'; i]);
        }
        store.insert_object("b", "other/skip.txt", b"nope".to_vec());

        let objects = list_all_objects(&store, "b", "logs/")
            .await
            .expect("listing should succeed");
        assert_eq!(objects.len(), 7);
        assert!(objects.iter().all(|o| o.key.starts_with("logs/")));
        assert_eq!(store.list_calls(), 4);
    }

    #[tokio::test]
    async fn test_should_report_missing_bucket() {
        let store = MemoryStore::new();
        let err = list_all_objects(&store, "missing", "")
            .await
            .expect_err("missing bucket should fail");
        assert!(matches!(err, StoreError::NoSuchBucket { .. }));
    }

    #[test]
    fn test_should_build_shallow_and_recursive_requests() {
        let shallow = ListObjectsRequest::shallow("b", "p/");
        assert_eq!(shallow.delimiter.as_deref(), Some("/"));
        let recursive = ListObjectsRequest::recursive("b", "p/");
        assert_eq!(recursive.delimiter, None);
        assert_eq!(recursive.continuation_token, None);
    }
}
