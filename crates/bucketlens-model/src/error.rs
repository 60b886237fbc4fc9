//! API error codes and the error response type.

use std::fmt;

/// Well-known BucketLens error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum ApiErrorCode {
    /// Unknown store name and no default store available.
    StoreNotFound,
    /// The store named by a management request does not exist.
    NoSuchStore,
    /// A store with the same name is already configured.
    StoreAlreadyExists,
    /// A parameter was missing or malformed.
    InvalidArgument,
    /// The request body could not be interpreted.
    InvalidRequest,
    /// No endpoint matches the request path.
    NoSuchRoute,
    /// The path exists but not for this method.
    MethodNotAllowed,
    /// The request body exceeded the configured ceiling.
    PayloadTooLarge,
    /// The backing store rejected or failed a call.
    UpstreamError,
    /// Anything else.
    #[default]
    InternalError,
}

impl ApiErrorCode {
    /// Returns the error code as a string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StoreNotFound => "StoreNotFound",
            Self::NoSuchStore => "NoSuchStore",
            Self::StoreAlreadyExists => "StoreAlreadyExists",
            Self::InvalidArgument => "InvalidArgument",
            Self::InvalidRequest => "InvalidRequest",
            Self::NoSuchRoute => "NoSuchRoute",
            Self::MethodNotAllowed => "MethodNotAllowed",
            Self::PayloadTooLarge => "PayloadTooLarge",
            Self::UpstreamError => "UpstreamError",
            Self::InternalError => "InternalError",
        }
    }

    /// Returns the default HTTP status code for this error.
    #[must_use]
    pub fn default_status_code(&self) -> http::StatusCode {
        match self {
            Self::StoreNotFound | Self::InvalidArgument | Self::InvalidRequest => {
                http::StatusCode::BAD_REQUEST
            }
            Self::NoSuchStore | Self::NoSuchRoute => http::StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => http::StatusCode::METHOD_NOT_ALLOWED,
            Self::StoreAlreadyExists => http::StatusCode::CONFLICT,
            Self::PayloadTooLarge => http::StatusCode::PAYLOAD_TOO_LARGE,
            Self::UpstreamError | Self::InternalError => http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the default message for this error.
    #[must_use]
    pub fn default_message(&self) -> &'static str {
        match self {
            Self::StoreNotFound => "The specified store is not configured",
            Self::NoSuchStore => "The specified store does not exist",
            Self::StoreAlreadyExists => "A store with this name already exists",
            Self::InvalidArgument => "Invalid argument",
            Self::InvalidRequest => "Invalid request",
            Self::NoSuchRoute => "No endpoint matches the request path",
            Self::MethodNotAllowed => "The specified method is not allowed against this resource",
            Self::PayloadTooLarge => "The request body exceeds the maximum allowed size",
            Self::UpstreamError => "The backing store failed the request",
            Self::InternalError => "Internal server error",
        }
    }
}

impl fmt::Display for ApiErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An API error response.
#[derive(Debug)]
pub struct ApiError {
    /// The error code.
    pub code: ApiErrorCode,
    /// A human-readable error message.
    pub message: String,
    /// The resource that caused the error.
    pub resource: Option<String>,
    /// The request ID.
    pub request_id: Option<String>,
    /// The HTTP status code.
    pub status_code: http::StatusCode,
    /// The underlying source error, if any.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiError({}): {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl ApiError {
    /// Create a new error from a code, using its default message.
    #[must_use]
    pub fn new(code: ApiErrorCode) -> Self {
        Self::with_message(code, code.default_message())
    }

    /// Create a new error with a custom message.
    #[must_use]
    pub fn with_message(code: ApiErrorCode, message: impl Into<String>) -> Self {
        Self {
            status_code: code.default_status_code(),
            message: message.into(),
            code,
            resource: None,
            request_id: None,
            source: None,
        }
    }

    /// Set the resource that caused this error.
    #[must_use]
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Set the request ID.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Set the source error.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Create an `InvalidArgument` error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::with_message(ApiErrorCode::InvalidArgument, message)
    }

    /// Create an `InvalidRequest` error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::with_message(ApiErrorCode::InvalidRequest, message)
    }

    /// Create a `NoSuchRoute` error for the given path.
    #[must_use]
    pub fn no_such_route(path: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::NoSuchRoute).with_resource(path)
    }

    /// Create a `MethodNotAllowed` error for the given path.
    #[must_use]
    pub fn method_not_allowed(path: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::MethodNotAllowed).with_resource(path)
    }

    /// Create an `InternalError` error.
    #[must_use]
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::with_message(ApiErrorCode::InternalError, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_map_codes_to_status() {
        assert_eq!(
            ApiErrorCode::StoreNotFound.default_status_code(),
            http::StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiErrorCode::StoreAlreadyExists.default_status_code(),
            http::StatusCode::CONFLICT
        );
        assert_eq!(
            ApiErrorCode::PayloadTooLarge.default_status_code(),
            http::StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ApiErrorCode::UpstreamError.default_status_code(),
            http::StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiErrorCode::NoSuchRoute.default_status_code(),
            http::StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_should_use_default_message() {
        let err = ApiError::new(ApiErrorCode::MethodNotAllowed);
        assert_eq!(err.message, ApiErrorCode::MethodNotAllowed.default_message());
        assert_eq!(err.status_code, http::StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test]
    fn test_should_attach_resource_and_request_id() {
        let err = ApiError::no_such_route("/nope").with_request_id("req-1");
        assert_eq!(err.resource.as_deref(), Some("/nope"));
        assert_eq!(err.request_id.as_deref(), Some("req-1"));
        assert_eq!(err.to_string(), "ApiError(NoSuchRoute): No endpoint matches the request path");
    }

    #[test]
    fn test_should_expose_source() {
        let io = std::io::Error::other("disk gone");
        let err = ApiError::internal_error("write failed").with_source(io);
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("disk gone"));
    }
}
