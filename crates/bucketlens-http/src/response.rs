//! Response construction: JSON payloads, streamed attachments, and the JSON
//! error envelope.

use std::io;

use bytes::Bytes;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Serialize;
use tokio::sync::mpsc;

use bucketlens_model::ApiError;

use crate::body::ApiResponseBody;

const JSON_CONTENT_TYPE: &str = "application/json";

/// Serialize `value` as a JSON response with the given status.
pub fn json_response<T: Serialize + ?Sized>(
    status: http::StatusCode,
    value: &T,
) -> Result<http::Response<ApiResponseBody>, ApiError> {
    let bytes = serde_json::to_vec(value).map_err(|e| {
        ApiError::internal_error(format!("Failed to serialize response: {e}")).with_source(e)
    })?;
    http::Response::builder()
        .status(status)
        .header(http::header::CONTENT_TYPE, JSON_CONTENT_TYPE)
        .body(ApiResponseBody::from_bytes(bytes))
        .map_err(|e| ApiError::internal_error(format!("Failed to build response: {e}")))
}

/// An empty response with the given status.
pub fn empty_response(
    status: http::StatusCode,
) -> Result<http::Response<ApiResponseBody>, ApiError> {
    http::Response::builder()
        .status(status)
        .body(ApiResponseBody::empty())
        .map_err(|e| ApiError::internal_error(format!("Failed to build response: {e}")))
}

/// A `200` download whose body is fed by `chunks`.
pub fn attachment_response(
    content_type: &str,
    file_name: &str,
    chunks: mpsc::Receiver<io::Result<Bytes>>,
) -> Result<http::Response<ApiResponseBody>, ApiError> {
    http::Response::builder()
        .status(http::StatusCode::OK)
        .header(http::header::CONTENT_TYPE, content_type)
        .header(http::header::CONTENT_DISPOSITION, content_disposition(file_name))
        .body(ApiResponseBody::from_stream(chunks))
        .map_err(|e| ApiError::internal_error(format!("Failed to build response: {e}")))
}

/// `attachment; filename="<name>"`, falling back to the RFC 5987 form when
/// the name is not plain printable ASCII.
fn content_disposition(file_name: &str) -> String {
    let plain = file_name
        .bytes()
        .all(|b| (0x20..0x7f).contains(&b) && b != b'"' && b != b'\\');
    if plain {
        format!("attachment; filename=\"{file_name}\"")
    } else {
        let encoded = utf8_percent_encode(file_name, NON_ALPHANUMERIC);
        format!("attachment; filename*=UTF-8''{encoded}")
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorEnvelope<'a> {
    code: &'a str,
    message: &'a str,
    request_id: &'a str,
}

/// Convert an [`ApiError`] into a JSON error response.
#[must_use]
pub fn error_to_response(err: &ApiError, request_id: &str) -> http::Response<ApiResponseBody> {
    let envelope = ErrorEnvelope {
        code: err.code.as_str(),
        message: &err.message,
        request_id,
    };
    let body = serde_json::to_vec(&envelope)
        .map(ApiResponseBody::from_bytes)
        .unwrap_or_default();

    http::Response::builder()
        .status(err.status_code)
        .header(http::header::CONTENT_TYPE, JSON_CONTENT_TYPE)
        .body(body)
        .unwrap_or_else(|_| {
            http::Response::builder()
                .status(http::StatusCode::INTERNAL_SERVER_ERROR)
                .body(ApiResponseBody::empty())
                .expect("static response should be valid")
        })
}
