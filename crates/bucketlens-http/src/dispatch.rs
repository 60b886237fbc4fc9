//! Operation dispatch: hands a routed request to the business-logic handler.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;

use bucketlens_model::{ApiError, ApiOperation};

use crate::body::ApiResponseBody;
use crate::router::RoutingContext;

/// Boxed future returned by [`ApiHandler::handle_operation`].
pub type HandlerFuture =
    Pin<Box<dyn Future<Output = Result<http::Response<ApiResponseBody>, ApiError>> + Send>>;

/// The boundary between the HTTP layer and BucketLens business logic.
///
/// The implementor receives the identified operation, the raw request parts,
/// the collected body, and the routing context, and returns a complete
/// response. Errors are rendered by the service as JSON envelopes.
pub trait ApiHandler: Send + Sync + 'static {
    /// Handle one routed operation.
    fn handle_operation(
        &self,
        op: ApiOperation,
        parts: http::request::Parts,
        body: Bytes,
        ctx: RoutingContext,
    ) -> HandlerFuture;
}

/// Dispatch a routed request to the handler.
pub async fn dispatch_operation<H: ApiHandler>(
    handler: &H,
    parts: http::request::Parts,
    body: Bytes,
    ctx: RoutingContext,
) -> Result<http::Response<ApiResponseBody>, ApiError> {
    let op = ctx.operation;
    tracing::debug!(operation = %op, bucket = ?ctx.bucket, target = ?ctx.target, "dispatching operation");
    handler.handle_operation(op, parts, body, ctx).await
}

#[cfg(test)]
mod tests {
    use bucketlens_model::ApiErrorCode;

    use super::*;

    #[derive(Debug)]
    struct RejectingHandler;

    impl ApiHandler for RejectingHandler {
        fn handle_operation(
            &self,
            op: ApiOperation,
            _parts: http::request::Parts,
            _body: Bytes,
            _ctx: RoutingContext,
        ) -> HandlerFuture {
            Box::pin(async move { Err(ApiError::invalid_argument(op.as_str())) })
        }
    }

    #[tokio::test]
    async fn test_should_pass_operation_to_handler() {
        let (parts, ()) = http::Request::builder()
            .uri("/stores")
            .body(())
            .expect("valid request")
            .into_parts();
        let ctx = RoutingContext {
            operation: ApiOperation::ListStores,
            bucket: None,
            target: None,
            query_params: vec![],
        };

        let err = dispatch_operation(&RejectingHandler, parts, Bytes::new(), ctx)
            .await
            .expect_err("handler rejects");
        assert_eq!(err.code, ApiErrorCode::InvalidArgument);
        assert_eq!(err.message, "ListStores");
    }
}
