//! The hyper service for the BucketLens API.
//!
//! [`BucketLensHttpService`] runs every request through:
//!
//! 1. Health check interception (`GET /health`, `GET /_health`)
//! 2. CORS preflight (`OPTIONS` on any path)
//! 3. Routing via [`ApiRouter`]
//! 4. Bounded body collection (`413` past [`HttpConfig::max_body_size`])
//! 5. Dispatch to the [`ApiHandler`]
//! 6. Common response headers (`x-request-id`, `Server`, CORS)
//! 7. JSON error rendering

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::service::Service;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use bucketlens_model::{ApiError, ApiErrorCode};

use crate::body::ApiResponseBody;
use crate::dispatch::{ApiHandler, dispatch_operation};
use crate::response::error_to_response;
use crate::router::{ApiRouter, strip_api_prefix};

/// Default request body ceiling: 100 MiB.
pub const DEFAULT_MAX_BODY_SIZE: usize = 100 * 1024 * 1024;

/// Response header carrying the per-request ID.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Configuration for the HTTP service.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Largest request body accepted, in bytes.
    pub max_body_size: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

/// The BucketLens HTTP service that implements hyper's `Service` trait.
#[derive(Debug)]
pub struct BucketLensHttpService<H: ApiHandler> {
    handler: Arc<H>,
    router: ApiRouter,
    config: Arc<HttpConfig>,
}

impl<H: ApiHandler> BucketLensHttpService<H> {
    /// Create a service around `handler`.
    #[must_use]
    pub fn new(handler: H, config: HttpConfig) -> Self {
        Self::from_shared(Arc::new(handler), config)
    }

    /// Create a service from an already shared handler.
    #[must_use]
    pub fn from_shared(handler: Arc<H>, config: HttpConfig) -> Self {
        Self {
            handler,
            router: ApiRouter::new(),
            config: Arc::new(config),
        }
    }

    /// Run one request through the full pipeline.
    ///
    /// Generic over the request body so the pipeline can be driven without
    /// a live connection.
    pub async fn handle<B>(&self, req: http::Request<B>) -> http::Response<ApiResponseBody>
    where
        B: http_body::Body<Data = Bytes> + Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let request_id = Uuid::new_v4().to_string();
        let response = process_request(
            req,
            self.handler.as_ref(),
            &self.router,
            &self.config,
            &request_id,
        )
        .await;
        add_common_headers(response, &request_id)
    }
}

impl<H: ApiHandler> Clone for BucketLensHttpService<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            router: self.router.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<H: ApiHandler> Service<http::Request<Incoming>> for BucketLensHttpService<H> {
    type Response = http::Response<ApiResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.handle(req).await) })
    }
}

async fn process_request<H, B>(
    req: http::Request<B>,
    handler: &H,
    router: &ApiRouter,
    config: &HttpConfig,
    request_id: &str,
) -> http::Response<ApiResponseBody>
where
    H: ApiHandler,
    B: http_body::Body<Data = Bytes> + Send,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let method = req.method().clone();
    let uri = req.uri().clone();
    debug!(%method, %uri, request_id, "processing request");

    // 1. Health check interception.
    if is_health_check(&method, uri.path()) {
        return health_check_response();
    }

    // 2. CORS preflight.
    if method == http::Method::OPTIONS {
        return cors_preflight_response();
    }

    // 3. Route.
    let ctx = match router.resolve(&req) {
        Ok(ctx) => ctx,
        Err(err) => {
            warn!(%method, %uri, error = %err, request_id, "failed to route request");
            return error_to_response(&err, request_id);
        }
    };

    info!(
        operation = %ctx.operation,
        bucket = ?ctx.bucket,
        target = ?ctx.target,
        request_id,
        "routed request"
    );

    // 4. Collect body.
    let (parts, body) = req.into_parts();
    let limit = u64::try_from(config.max_body_size).unwrap_or(u64::MAX);
    if declared_length(&parts.headers).is_some_and(|len| len > limit) {
        warn!(request_id, limit = config.max_body_size, "declared body length over limit");
        return error_to_response(&ApiError::new(ApiErrorCode::PayloadTooLarge), request_id);
    }
    let body = match collect_body(body, config.max_body_size).await {
        Ok(body) => body,
        Err(err) => {
            if err.code == ApiErrorCode::PayloadTooLarge {
                warn!(request_id, limit = config.max_body_size, "request body over limit");
            } else {
                error!(error = %err, request_id, "failed to collect request body");
            }
            return error_to_response(&err, request_id);
        }
    };

    // 5. Dispatch.
    match dispatch_operation(handler, parts, body, ctx).await {
        Ok(response) => response,
        Err(err) => {
            if err.status_code.is_server_error() {
                warn!(error = %err, request_id, "operation failed");
            } else {
                debug!(error = %err, request_id, "operation rejected");
            }
            error_to_response(&err, request_id)
        }
    }
}

/// Collect a request body, failing with `PayloadTooLarge` past `limit` bytes.
async fn collect_body<B>(body: B, limit: usize) -> Result<Bytes, ApiError>
where
    B: http_body::Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
            Err(ApiError::new(ApiErrorCode::PayloadTooLarge))
        }
        Err(err) => Err(ApiError::internal_error(format!(
            "Failed to read request body: {err}"
        ))),
    }
}

fn declared_length(headers: &http::HeaderMap) -> Option<u64> {
    headers
        .get(http::header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

/// Check if the request is a health check probe.
fn is_health_check(method: &http::Method, path: &str) -> bool {
    *method == http::Method::GET && matches!(strip_api_prefix(path), "/health" | "/_health")
}

fn health_check_response() -> http::Response<ApiResponseBody> {
    http::Response::builder()
        .status(http::StatusCode::OK)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(ApiResponseBody::from_string(
            r#"{"status":"running","service":"bucketlens"}"#,
        ))
        .expect("static health response should be valid")
}

fn cors_preflight_response() -> http::Response<ApiResponseBody> {
    http::Response::builder()
        .status(http::StatusCode::OK)
        .header("Access-Control-Allow-Origin", "*")
        .header(
            "Access-Control-Allow-Methods",
            "GET, POST, PUT, DELETE, OPTIONS, HEAD",
        )
        .header(
            "Access-Control-Allow-Headers",
            "X-Requested-With, Content-Type, Authorization",
        )
        .header("Access-Control-Max-Age", "86400")
        .body(ApiResponseBody::empty())
        .expect("static CORS response should be valid")
}

fn add_common_headers(
    mut response: http::Response<ApiResponseBody>,
    request_id: &str,
) -> http::Response<ApiResponseBody> {
    let headers = response.headers_mut();

    if let Ok(hv) = http::header::HeaderValue::from_str(request_id) {
        headers.insert(REQUEST_ID_HEADER, hv);
    }
    headers.insert(
        http::header::SERVER,
        http::header::HeaderValue::from_static("BucketLens"),
    );
    headers.insert(
        "Access-Control-Allow-Origin",
        http::header::HeaderValue::from_static("*"),
    );
    headers.insert(
        "Access-Control-Expose-Headers",
        http::header::HeaderValue::from_static("x-request-id, Content-Disposition"),
    );

    response
}
