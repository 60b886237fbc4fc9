//! Request routing: maps method and path to an [`ApiOperation`].
//!
//! Routes (each may be prefixed by `/api`):
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | GET | `/buckets/{bucket}/objects` | `ListObjects` |
//! | POST | `/buckets/{bucket}/objects` | `UploadObject` |
//! | GET | `/buckets/{bucket}/folders/{prefix..}?download=true` | `DownloadFolder` |
//! | GET | `/prefix-stats` | `GetPrefixStats` |
//! | DELETE | `/prefix-stats` | `InvalidatePrefixStats` |
//! | GET | `/stores` | `ListStores` |
//! | POST | `/stores` | `CreateStore` |
//! | DELETE | `/stores/{name}` | `DeleteStore` |
//!
//! `/regions` is accepted wherever `/stores` is.

use http::Method;
use percent_encoding::percent_decode_str;

use bucketlens_model::{ApiError, ApiOperation};

/// Path prefix the browser UI puts in front of every API call.
pub const API_PREFIX: &str = "/api";

/// Maps requests to operations.
#[derive(Debug, Clone, Default)]
pub struct ApiRouter;

/// The result of routing a request.
#[derive(Debug, Clone)]
pub struct RoutingContext {
    /// The identified operation.
    pub operation: ApiOperation,
    /// Bucket path parameter, if the route has one.
    pub bucket: Option<String>,
    /// Trailing path parameter: the folder prefix of a download or the
    /// store name of a store deletion.
    pub target: Option<String>,
    /// Decoded query parameters in request order.
    pub query_params: Vec<(String, String)>,
}

impl RoutingContext {
    /// First value of a query parameter.
    #[must_use]
    pub fn query_value(&self, name: &str) -> Option<&str> {
        query_value(&self.query_params, name)
    }

    /// Selected store name; `store` wins over the legacy `region`, and an
    /// empty string selects the default store.
    #[must_use]
    pub fn store(&self) -> &str {
        self.query_value("store")
            .or_else(|| self.query_value("region"))
            .unwrap_or_default()
    }

    /// Bucket path parameter, or an empty string.
    #[must_use]
    pub fn bucket(&self) -> &str {
        self.bucket.as_deref().unwrap_or_default()
    }

    /// Trailing path parameter, or an empty string.
    #[must_use]
    pub fn target(&self) -> &str {
        self.target.as_deref().unwrap_or_default()
    }
}

impl ApiRouter {
    /// Create a router.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Resolve a request to a routing context.
    ///
    /// # Errors
    ///
    /// `NoSuchRoute` when no route matches the path, `MethodNotAllowed` when
    /// one does but not for this method.
    pub fn resolve<B>(&self, req: &http::Request<B>) -> Result<RoutingContext, ApiError> {
        let uri = req.uri();
        let query_params = parse_query_params(uri.query().unwrap_or_default());
        let path = strip_api_prefix(uri.path());

        let (operation, bucket, target) = identify_operation(req.method(), path, &query_params)?;
        Ok(RoutingContext {
            operation,
            bucket,
            target,
            query_params,
        })
    }
}

/// Remove a leading `/api` segment, if present.
#[must_use]
pub fn strip_api_prefix(path: &str) -> &str {
    match path.strip_prefix(API_PREFIX) {
        Some("") => "/",
        Some(rest) if rest.starts_with('/') => rest,
        _ => path,
    }
}

type Route = (ApiOperation, Option<String>, Option<String>);

fn identify_operation(
    method: &Method,
    path: &str,
    params: &[(String, String)],
) -> Result<Route, ApiError> {
    let trimmed = path.trim_start_matches('/');
    let mut segments = trimmed.splitn(4, '/');
    let head = segments.next().unwrap_or_default();

    match head {
        "stores" | "regions" => match non_empty(segments.next()) {
            None => match *method {
                Method::GET => Ok((ApiOperation::ListStores, None, None)),
                Method::POST => Ok((ApiOperation::CreateStore, None, None)),
                _ => Err(ApiError::method_not_allowed(path)),
            },
            Some(name) if segments.next().is_none() => match *method {
                Method::DELETE => Ok((ApiOperation::DeleteStore, None, Some(decode_uri_component(name)))),
                _ => Err(ApiError::method_not_allowed(path)),
            },
            Some(_) => Err(ApiError::no_such_route(path)),
        },
        "prefix-stats" if non_empty(segments.next()).is_none() => match *method {
            Method::GET => Ok((ApiOperation::GetPrefixStats, None, None)),
            Method::DELETE => Ok((ApiOperation::InvalidatePrefixStats, None, None)),
            _ => Err(ApiError::method_not_allowed(path)),
        },
        "buckets" => {
            let Some(bucket) = non_empty(segments.next()).map(decode_uri_component) else {
                return Err(ApiError::no_such_route(path));
            };
            let collection = segments.next();
            let rest = non_empty(segments.next());
            match (collection, rest) {
                (Some("objects"), None) => match *method {
                    Method::GET => Ok((ApiOperation::ListObjects, Some(bucket), None)),
                    Method::POST => Ok((ApiOperation::UploadObject, Some(bucket), None)),
                    _ => Err(ApiError::method_not_allowed(path)),
                },
                (Some("folders"), Some(prefix)) => {
                    if *method != Method::GET {
                        return Err(ApiError::method_not_allowed(path));
                    }
                    if query_value(params, "download") != Some("true") {
                        return Err(ApiError::no_such_route(path));
                    }
                    Ok((
                        ApiOperation::DownloadFolder,
                        Some(bucket),
                        Some(decode_uri_component(prefix)),
                    ))
                }
                _ => Err(ApiError::no_such_route(path)),
            }
        }
        _ => Err(ApiError::no_such_route(path)),
    }
}

fn non_empty(segment: Option<&str>) -> Option<&str> {
    segment.filter(|s| !s.is_empty())
}

/// Decode a percent-encoded path segment.
fn decode_uri_component(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

/// Parse a query string into decoded key-value pairs.
fn parse_query_params(query: &str) -> Vec<(String, String)> {
    form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

fn query_value<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}
