//! Integration tests for the BucketLens server.
//!
//! These tests need a running BucketLens server and an S3-compatible store
//! it can reach (MinIO works). They are marked `#[ignore]` so they don't run
//! during normal `cargo test`.
//!
//! ```text
//! docker run -d -p 9000:9000 minio/minio server /data
//! bucketlens-server &
//! cargo test -p bucketlens-integration -- --ignored
//! ```
//!
//! | Variable | Default |
//! |----------|---------|
//! | `BUCKETLENS_URL` | `http://localhost:8081/api` |
//! | `S3_ENDPOINT_URL` | `http://localhost:9000` |
//! | `S3_ACCESS_KEY` / `S3_SECRET_KEY` | `minioadmin` |

use std::sync::Once;
use std::time::Duration;

use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;

static INIT: Once = Once::new();

/// Attempts made by [`poll_prefix_stats`] before giving up.
pub const STATS_POLL_ATTEMPTS: usize = 40;

/// Fixed delay between two [`poll_prefix_stats`] attempts.
pub const STATS_POLL_INTERVAL: Duration = Duration::from_millis(250);

fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_owned())
}

/// Base URL of the BucketLens API, including the `/api` prefix.
#[must_use]
pub fn api_base() -> String {
    env_or("BUCKETLENS_URL", "http://localhost:8081/api")
}

/// Full URL for an API path such as `/stores`.
#[must_use]
pub fn api_url(path: &str) -> String {
    format!("{}{path}", api_base().trim_end_matches('/'))
}

/// Endpoint of the backing S3-compatible store.
#[must_use]
pub fn s3_endpoint() -> String {
    env_or("S3_ENDPOINT_URL", "http://localhost:9000")
}

fn s3_keys() -> (String, String) {
    (
        env_or("S3_ACCESS_KEY", "minioadmin"),
        env_or("S3_SECRET_KEY", "minioadmin"),
    )
}

/// HTTP client for the BucketLens API.
#[must_use]
pub fn api_client() -> reqwest::Client {
    init_tracing();
    reqwest::Client::new()
}

/// S3 client used to seed and clean up test buckets directly.
#[must_use]
pub fn s3_client() -> aws_sdk_s3::Client {
    init_tracing();

    let (access_key, secret_key) = s3_keys();
    let creds = Credentials::new(access_key, secret_key, None, None, "integration-test");

    let config = aws_sdk_s3::config::Builder::new()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(creds)
        .endpoint_url(s3_endpoint())
        .force_path_style(true)
        .build();

    aws_sdk_s3::Client::from_conf(config)
}

/// Generate a unique name for a test resource.
#[must_use]
pub fn unique_name(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().to_string()[..8].to_owned();
    format!("test-{prefix}-{id}")
}

/// Register a store pointing at the test S3 endpoint and return its name.
///
/// The store has no explicit signing region, so requests are signed for
/// `us-east-1`.
pub async fn register_test_store(client: &reqwest::Client) -> String {
    let name = unique_name("store");
    let (access_key, secret_key) = s3_keys();
    let resp = client
        .post(api_url("/stores"))
        .json(&serde_json::json!({
            "name": name,
            "region": "local",
            "accessKey": access_key,
            "secretKey": secret_key,
            "endpoint": s3_endpoint(),
        }))
        .send()
        .await
        .unwrap_or_else(|e| panic!("failed to register store {name}: {e}"));
    assert_eq!(resp.status(), reqwest::StatusCode::CREATED, "register {name}");
    name
}

/// Remove a store registered by [`register_test_store`].
pub async fn remove_test_store(client: &reqwest::Client, name: &str) {
    let _ = client
        .delete(api_url(&format!("/stores/{}", urlencoding::encode(name))))
        .send()
        .await;
}

/// Create a bucket holding `objects`.
pub async fn seed_bucket(client: &aws_sdk_s3::Client, prefix: &str, objects: &[(&str, &[u8])]) -> String {
    let bucket = unique_name(prefix);
    client
        .create_bucket()
        .bucket(&bucket)
        .send()
        .await
        .unwrap_or_else(|e| panic!("failed to create bucket {bucket}: {e}"));
    for (key, data) in objects {
        client
            .put_object()
            .bucket(&bucket)
            .key(*key)
            .body(ByteStream::from(data.to_vec()))
            .send()
            .await
            .unwrap_or_else(|e| panic!("put {key}: {e}"));
    }
    bucket
}

/// Delete all objects in a bucket, then delete the bucket.
pub async fn cleanup_bucket(client: &aws_sdk_s3::Client, bucket: &str) {
    let mut continuation_token = None;
    loop {
        let mut req = client.list_objects_v2().bucket(bucket);
        if let Some(token) = continuation_token.take() {
            req = req.continuation_token(token);
        }
        let Ok(resp) = req.send().await else {
            return; // Bucket may not exist.
        };

        for obj in resp.contents() {
            if let Some(key) = obj.key() {
                let _ = client.delete_object().bucket(bucket).key(key).send().await;
            }
        }

        if resp.is_truncated() == Some(true) {
            continuation_token = resp.next_continuation_token().map(ToOwned::to_owned);
        } else {
            break;
        }
    }

    let _ = client.delete_bucket().bucket(bucket).send().await;
}

/// `/prefix-stats` URL for a store, bucket and prefix.
#[must_use]
pub fn prefix_stats_url(store: &str, bucket: &str, prefix: &str) -> String {
    api_url(&format!(
        "/prefix-stats?store={}&bucket={}&prefix={}",
        urlencoding::encode(store),
        urlencoding::encode(bucket),
        urlencoding::encode(prefix),
    ))
}

/// Poll `/prefix-stats` until the entry is ready or failed.
///
/// Gives up after [`STATS_POLL_ATTEMPTS`] attempts spaced by
/// [`STATS_POLL_INTERVAL`].
pub async fn poll_prefix_stats(
    client: &reqwest::Client,
    store: &str,
    bucket: &str,
    prefix: &str,
) -> anyhow::Result<serde_json::Value> {
    let url = prefix_stats_url(store, bucket, prefix);
    for attempt in 1..=STATS_POLL_ATTEMPTS {
        let view: serde_json::Value = client.get(&url).send().await?.json().await?;
        if view["ready"] == true || view.get("error").is_some() {
            return Ok(view);
        }
        tracing::debug!(attempt, %url, "prefix stats not ready yet");
        tokio::time::sleep(STATS_POLL_INTERVAL).await;
    }
    anyhow::bail!("prefix stats for {bucket}/{prefix} not ready after {STATS_POLL_ATTEMPTS} attempts")
}

/// Build a `multipart/form-data` upload body; returns the content type and body.
#[must_use]
pub fn upload_form(prefix: Option<&str>, file_name: &str, data: &[u8]) -> (String, Vec<u8>) {
    let boundary = format!("----bucketlens{}", uuid::Uuid::new_v4().simple());
    let mut body = Vec::new();
    if let Some(prefix) = prefix {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"prefix\"\r\n\r\n{prefix}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={boundary}"), body)
}

mod test_archive;
mod test_listing;
mod test_routing;
mod test_stores;
mod test_upload;
