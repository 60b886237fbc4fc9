//! Wire and data types for the BucketLens API.
//!
//! This crate has no I/O. It defines the shapes exchanged between the HTTP
//! layer (`bucketlens-http`), the business logic (`bucketlens-core`) and API
//! clients:
//!
//! - [`StoreConfig`] / [`StoreView`]: a configured backing object store.
//! - [`ListingEntry`]: one row of a shallow prefix listing.
//! - [`PrefixStatsView`]: the poll-style view of a prefix aggregate.
//! - [`ApiOperation`]: every routed endpoint.
//! - [`ApiError`] / [`ApiErrorCode`]: error responses.

pub mod error;
pub mod operations;
pub mod types;

pub use error::{ApiError, ApiErrorCode};
pub use operations::ApiOperation;
pub use types::{ListingEntry, PrefixStatsView, StoreConfig, StoreView, UploadResult};
