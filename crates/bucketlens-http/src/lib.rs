//! HTTP layer for the BucketLens API.
//!
//! - **Routing** ([`router`]): maps method and path to an
//!   [`ApiOperation`](bucketlens_model::ApiOperation), stripping the optional
//!   `/api` prefix and percent-decoding path parameters.
//! - **Multipart** ([`multipart`]): parses `multipart/form-data` upload forms.
//! - **Responses** ([`response`]): JSON bodies, streamed attachments and the
//!   JSON error envelope.
//! - **Dispatch** ([`dispatch`]): the [`ApiHandler`] boundary to business logic.
//! - **Service** ([`service`]): [`BucketLensHttpService`], the hyper `Service`.
//! - **Body** ([`body`]): [`ApiResponseBody`], buffered, streamed or empty.
//!
//! # Architecture
//!
//! ```text
//! HTTP Request
//!   -> BucketLensHttpService (hyper Service)
//!     -> Health check / CORS preflight interception
//!     -> ApiRouter (method + path -> ApiOperation)
//!     -> Bounded body collection (413 past the ceiling)
//!     -> dispatch_operation (ApiHandler trait)
//!     -> Common response headers (x-request-id, Server, CORS)
//!   <- HTTP Response
//! ```

// ApiError is returned by value on every fallible path of this crate.
#![allow(clippy::result_large_err)]

pub mod body;
pub mod dispatch;
pub mod multipart;
pub mod response;
pub mod router;
pub mod service;

pub use body::ApiResponseBody;
pub use dispatch::ApiHandler;
pub use router::{ApiRouter, RoutingContext};
pub use service::{BucketLensHttpService, HttpConfig};
