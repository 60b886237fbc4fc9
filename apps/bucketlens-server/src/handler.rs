//! [`ApiHandler`] implementation for [`BucketLens`].
//!
//! Bridges the HTTP layer (`bucketlens-http`) with the business logic
//! (`bucketlens-core`): each routed operation reads its parameters from the
//! routing context, calls the matching `handle_*` method, and renders the
//! result as JSON or as a streamed attachment.

use bytes::Bytes;
use http::StatusCode;

use bucketlens_core::BucketLens;
use bucketlens_http::body::ApiResponseBody;
use bucketlens_http::dispatch::{ApiHandler, HandlerFuture};
use bucketlens_http::multipart;
use bucketlens_http::response::{attachment_response, empty_response, json_response};
use bucketlens_http::router::RoutingContext;
use bucketlens_model::{ApiError, ApiOperation, StoreConfig};

/// Wrapper that implements [`ApiHandler`] by delegating to [`BucketLens`].
#[derive(Debug, Clone)]
pub struct BucketLensHandler(pub BucketLens);

impl ApiHandler for BucketLensHandler {
    fn handle_operation(
        &self,
        op: ApiOperation,
        parts: http::request::Parts,
        body: Bytes,
        ctx: RoutingContext,
    ) -> HandlerFuture {
        let lens = self.0.clone();
        Box::pin(async move {
            match op {
                ApiOperation::ListObjects => {
                    let prefix = ctx.query_value("prefix").unwrap_or_default();
                    let entries = lens
                        .handle_list_objects(ctx.store(), ctx.bucket(), prefix)
                        .await?;
                    json_response(StatusCode::OK, &entries)
                }
                ApiOperation::UploadObject => dispatch_upload(&lens, &parts, &ctx, &body).await,
                ApiOperation::DownloadFolder => {
                    let archive = lens
                        .handle_download_folder(ctx.store(), ctx.bucket(), ctx.target())
                        .await?;
                    attachment_response("application/zip", &archive.file_name, archive.body)
                }
                ApiOperation::GetPrefixStats => {
                    let (bucket, prefix) = stats_params(&ctx);
                    let view = lens.handle_get_prefix_stats(ctx.store(), bucket, prefix)?;
                    json_response(StatusCode::OK, &view)
                }
                ApiOperation::InvalidatePrefixStats => {
                    let (bucket, prefix) = stats_params(&ctx);
                    let removed = lens.handle_invalidate_prefix_stats(ctx.store(), bucket, prefix)?;
                    json_response(StatusCode::OK, &serde_json::json!({ "removed": removed }))
                }
                ApiOperation::ListStores => json_response(StatusCode::OK, &lens.handle_list_stores()),
                ApiOperation::CreateStore => {
                    let config: StoreConfig = serde_json::from_slice(&body).map_err(|e| {
                        ApiError::invalid_request(format!("Invalid store definition: {e}"))
                    })?;
                    let view = lens.handle_create_store(config)?;
                    json_response(StatusCode::CREATED, &view)
                }
                ApiOperation::DeleteStore => {
                    lens.handle_delete_store(ctx.target())?;
                    empty_response(StatusCode::OK)
                }
            }
        })
    }
}

fn stats_params(ctx: &RoutingContext) -> (&str, &str) {
    (
        ctx.query_value("bucket").unwrap_or_default(),
        ctx.query_value("prefix").unwrap_or_default(),
    )
}

/// Parse the multipart form and hand the file part to the upload buffer.
///
/// The `prefix` form field wins over a `prefix` query parameter.
async fn dispatch_upload(
    lens: &BucketLens,
    parts: &http::request::Parts,
    ctx: &RoutingContext,
    body: &Bytes,
) -> Result<http::Response<ApiResponseBody>, ApiError> {
    let content_type = parts
        .headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::invalid_request("Upload requires a Content-Type header"))?;

    let boundary = multipart::extract_boundary(content_type)?;
    let form = multipart::parse_multipart(body, &boundary)?;
    let prefix = form
        .field("prefix")
        .or_else(|| ctx.query_value("prefix"))
        .unwrap_or_default();

    let result = lens
        .handle_upload_object(
            ctx.store(),
            ctx.bucket(),
            prefix,
            &form.file.file_name,
            form.file.data.as_ref(),
        )
        .await?;
    json_response(StatusCode::OK, &result)
}
