//! [`StoreClient`] backed by `aws-sdk-s3`.

use async_trait::async_trait;
use aws_sdk_s3::config::{
    BehaviorVersion, Credentials, Region, RequestChecksumCalculation, ResponseChecksumValidation,
};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::operation::list_objects_v2::ListObjectsV2Error;
use aws_sdk_s3::primitives::ByteStream;
use chrono::{DateTime, Utc};
use tracing::debug;

use super::{ListObjectsRequest, ObjectPage, ObjectReader, ObjectSummary, StoreClient};
use crate::error::StoreError;
use crate::resolver::ClientDescriptor;
use crate::upload::BufferedUpload;

/// Provider name attached to the static credentials.
const CREDENTIALS_PROVIDER: &str = "bucketlens-store";

/// S3 client bound to one resolved store.
#[derive(Debug, Clone)]
pub struct S3StoreClient {
    client: aws_sdk_s3::Client,
}

impl S3StoreClient {
    /// Build a client from a resolved descriptor and its credentials.
    ///
    /// No network traffic happens here. Checksums are only sent when an
    /// operation requires them.
    #[must_use]
    pub fn new(descriptor: &ClientDescriptor, access_key: &str, secret_key: &str) -> Self {
        let credentials =
            Credentials::new(access_key, secret_key, None, None, CREDENTIALS_PROVIDER);
        let mut builder = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(descriptor.signing_region.clone()))
            .credentials_provider(credentials)
            .force_path_style(descriptor.force_path_style)
            .request_checksum_calculation(RequestChecksumCalculation::WhenRequired)
            .response_checksum_validation(ResponseChecksumValidation::WhenRequired);
        if let Some(endpoint) = &descriptor.endpoint {
            builder = builder.endpoint_url(endpoint);
        }
        debug!(
            store = %descriptor.store_name,
            signing_region = %descriptor.signing_region,
            endpoint = ?descriptor.endpoint,
            "built s3 client"
        );
        Self {
            client: aws_sdk_s3::Client::from_conf(builder.build()),
        }
    }
}

fn to_chrono(ts: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts.secs(), ts.subsec_nanos())
}

#[async_trait]
impl StoreClient for S3StoreClient {
    async fn list_objects_page(
        &self,
        request: &ListObjectsRequest,
    ) -> Result<ObjectPage, StoreError> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(&request.bucket)
            .prefix(&request.prefix)
            .set_delimiter(request.delimiter.clone())
            .set_continuation_token(request.continuation_token.clone())
            .send()
            .await
            .map_err(|err| {
                if err
                    .as_service_error()
                    .is_some_and(ListObjectsV2Error::is_no_such_bucket)
                {
                    StoreError::NoSuchBucket {
                        bucket: request.bucket.clone(),
                    }
                } else {
                    StoreError::service("ListObjectsV2", DisplayErrorContext(&err))
                }
            })?;

        let objects = output
            .contents()
            .iter()
            .filter_map(|object| {
                object.key().map(|key| ObjectSummary {
                    key: key.to_owned(),
                    size: object.size(),
                    last_modified: object.last_modified().and_then(to_chrono),
                })
            })
            .collect();
        let common_prefixes = output
            .common_prefixes()
            .iter()
            .filter_map(|cp| cp.prefix().map(str::to_owned))
            .collect();

        Ok(ObjectPage {
            objects,
            common_prefixes,
            is_truncated: output.is_truncated().unwrap_or(false),
            next_continuation_token: output.next_continuation_token().map(str::to_owned),
        })
    }

    async fn open_object(&self, bucket: &str, key: &str) -> Result<ObjectReader, StoreError> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| {
                if err.as_service_error().is_some_and(GetObjectError::is_no_such_key) {
                    StoreError::NoSuchKey {
                        bucket: bucket.to_owned(),
                        key: key.to_owned(),
                    }
                } else {
                    StoreError::service("GetObject", DisplayErrorContext(&err))
                }
            })?;
        Ok(Box::pin(output.body.into_async_read()))
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: &BufferedUpload,
    ) -> Result<(), StoreError> {
        let stream = ByteStream::from_path(body.path())
            .await
            .map_err(|err| StoreError::service("PutObject", err))?;
        let content_length = i64::try_from(body.len())
            .map_err(|_| StoreError::service("PutObject", "upload too large"))?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_length(content_length)
            .body(stream)
            .send()
            .await
            .map_err(|err| StoreError::service("PutObject", DisplayErrorContext(&err)))?;
        Ok(())
    }
}
