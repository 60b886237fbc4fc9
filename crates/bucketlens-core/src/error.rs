//! Error taxonomy for the browser core.
//!
//! [`StoreError`] covers failures reported by a backing store client.
//! [`BrowserError`] is what every provider operation returns; it maps onto
//! the wire [`ApiError`] through [`BrowserError::into_api_error`].
//!
//! Two failure kinds never reach a caller as a `BrowserError`: background
//! stats failures are captured into the cache entry, and archive failures
//! after the response head is sent terminate the body stream instead.
//!
//! # Usage
//!
//! ```
//! use bucketlens_core::error::BrowserError;
//! use bucketlens_model::ApiErrorCode;
//!
//! let err = BrowserError::StoreNotFound {
//!     name: "minio".to_owned(),
//! };
//! let api_err = err.into_api_error();
//! assert_eq!(api_err.code, ApiErrorCode::StoreNotFound);
//! ```

use bucketlens_model::{ApiError, ApiErrorCode};

/// Failure reported by a [`StoreClient`](crate::store::StoreClient).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The bucket does not exist on the store.
    #[error("bucket not found: {bucket}")]
    NoSuchBucket {
        /// The missing bucket.
        bucket: String,
    },

    /// The object does not exist on the store.
    #[error("object not found: {bucket}/{key}")]
    NoSuchKey {
        /// Bucket of the missing object.
        bucket: String,
        /// Key of the missing object.
        key: String,
    },

    /// The store rejected or failed the call.
    #[error("{operation} failed: {message}")]
    Service {
        /// Name of the store operation (`ListObjectsV2`, `GetObject`, ...).
        operation: &'static str,
        /// Upstream message, including any error code the store returned.
        message: String,
    },

    /// Local I/O while feeding or draining a store call.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Build a [`StoreError::Service`] from any displayable upstream error.
    pub fn service(operation: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Service {
            operation,
            message: err.to_string(),
        }
    }
}

/// Error returned by [`BucketLens`](crate::BucketLens) operations.
#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
    /// No store matches the requested name and none can be used as default.
    #[error("store not found: {name}")]
    StoreNotFound {
        /// The requested store name (empty when the default was requested).
        name: String,
    },

    /// A management request named a store that is not configured.
    #[error("no such store: {name}")]
    NoSuchStore {
        /// The requested store name.
        name: String,
    },

    /// The backing store failed a synchronous call.
    #[error("upstream error: {0}")]
    Upstream(#[from] StoreError),

    /// A request parameter is missing or malformed.
    #[error("{message}")]
    InvalidArgument {
        /// Description of the problem.
        message: String,
    },

    /// A store with the same name is already configured.
    #[error("store already exists: {name}")]
    StoreAlreadyExists {
        /// The duplicate name.
        name: String,
    },

    /// The registry could not be written to disk.
    #[error("failed to persist store registry to {path}: {source}")]
    Persistence {
        /// Registry file path.
        path: String,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },

    /// Local I/O failure (temporary files, streams).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Catch-all for unexpected failures.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl BrowserError {
    /// Shorthand for [`BrowserError::InvalidArgument`].
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// The wire error code for this error.
    #[must_use]
    pub fn code(&self) -> ApiErrorCode {
        match self {
            Self::StoreNotFound { .. } => ApiErrorCode::StoreNotFound,
            Self::NoSuchStore { .. } => ApiErrorCode::NoSuchStore,
            Self::Upstream(_) => ApiErrorCode::UpstreamError,
            Self::InvalidArgument { .. } => ApiErrorCode::InvalidArgument,
            Self::StoreAlreadyExists { .. } => ApiErrorCode::StoreAlreadyExists,
            Self::Persistence { .. } | Self::Io(_) | Self::Internal(_) => {
                ApiErrorCode::InternalError
            }
        }
    }

    /// Convert into the wire error, carrying the descriptive message.
    #[must_use]
    pub fn into_api_error(self) -> ApiError {
        let code = self.code();
        let resource = match &self {
            Self::StoreNotFound { name }
            | Self::NoSuchStore { name }
            | Self::StoreAlreadyExists { name } => Some(name.clone()),
            _ => None,
        };
        let err = ApiError::with_message(code, self.to_string());
        match resource {
            Some(resource) => err.with_resource(resource),
            None => err,
        }
    }
}

impl From<BrowserError> for ApiError {
    fn from(err: BrowserError) -> Self {
        err.into_api_error()
    }
}
