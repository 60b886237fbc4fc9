//! Key, prefix and token helpers shared by the operations.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;

use crate::error::StoreError;

// ---------------------------------------------------------------------------
// Prefixes and keys
// ---------------------------------------------------------------------------

/// Append a trailing `/` to a non-empty prefix that lacks one.
///
/// ```
/// use bucketlens_core::utils::normalize_prefix;
///
/// assert_eq!(normalize_prefix("photos/2024"), "photos/2024/");
/// assert_eq!(normalize_prefix("photos/"), "photos/");
/// assert_eq!(normalize_prefix(""), "");
/// ```
#[must_use]
pub fn normalize_prefix(prefix: &str) -> String {
    if prefix.is_empty() || prefix.ends_with('/') {
        prefix.to_owned()
    } else {
        format!("{prefix}/")
    }
}

/// Lexically clean a slash-separated path into an object key.
///
/// Empty and `.` segments are dropped, `..` removes the previous segment and
/// never climbs above the root, and the result has no leading or trailing
/// slash.
///
/// ```
/// use bucketlens_core::utils::clean_key_path;
///
/// assert_eq!(clean_key_path("/a//b/./c/../d.txt"), "a/b/d.txt");
/// assert_eq!(clean_key_path("../../etc/passwd"), "etc/passwd");
/// ```
#[must_use]
pub fn clean_key_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Object key for an uploaded file: `prefix` joined with `file_name`, cleaned.
///
/// The two are joined first and the result is cleaned as a whole, so `..`
/// in the file name can climb out of the prefix but never above the bucket
/// root. Returns `None` when the file name itself names nothing.
#[must_use]
pub fn upload_object_key(prefix: &str, file_name: &str) -> Option<String> {
    if clean_key_path(file_name).is_empty() {
        return None;
    }
    let key = clean_key_path(&format!("{prefix}/{file_name}"));
    (!key.is_empty()).then_some(key)
}

/// Download file name for a folder archive: the cleaned prefix plus `.zip`.
///
/// Quotes and backslashes are replaced so the name can sit inside a quoted
/// `Content-Disposition` parameter.
#[must_use]
pub fn archive_file_name(prefix: &str) -> String {
    let cleaned = clean_key_path(prefix);
    let base = if cleaned.is_empty() {
        "download".to_owned()
    } else {
        cleaned.replace(['"', '\\'], "_")
    };
    format!("{base}.zip")
}

// ---------------------------------------------------------------------------
// Continuation tokens
// ---------------------------------------------------------------------------

/// Encode the last returned key or prefix as an opaque continuation token.
#[must_use]
pub fn encode_continuation_token(key: &str) -> String {
    BASE64_STANDARD.encode(key.as_bytes())
}

/// Decode a continuation token produced by [`encode_continuation_token`].
pub fn decode_continuation_token(token: &str) -> Result<String, StoreError> {
    let bytes = BASE64_STANDARD
        .decode(token)
        .map_err(|_| StoreError::service("ListObjectsV2", "invalid continuation token"))?;
    String::from_utf8(bytes).map_err(|_| {
        StoreError::service("ListObjectsV2", "continuation token contains invalid UTF-8")
    })
}
