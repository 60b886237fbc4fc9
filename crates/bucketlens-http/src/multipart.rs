//! `multipart/form-data` parsing for browser uploads.
//!
//! The upload form carries one file part (field `file`) and optional text
//! fields such as `prefix`. The whole body is already in memory, bounded by
//! the service's body ceiling, so the file part is returned as a zero-copy
//! slice of it.

use std::collections::HashMap;
use std::ops::Range;

use bytes::Bytes;

use bucketlens_model::ApiError;

/// The file part of an upload form.
#[derive(Debug, Clone)]
pub struct FormFile {
    /// Client-side file name from the part's `Content-Disposition`.
    pub file_name: String,
    /// The part's declared content type.
    pub content_type: Option<String>,
    /// File content.
    pub data: Bytes,
}

/// A parsed upload form.
#[derive(Debug, Clone)]
pub struct MultipartForm {
    /// Text fields by name.
    pub fields: HashMap<String, String>,
    /// The uploaded file.
    pub file: FormFile,
}

impl MultipartForm {
    /// Value of a text field.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Extract the boundary parameter from a `multipart/form-data` content type.
pub fn extract_boundary(content_type: &str) -> Result<String, ApiError> {
    let parsed: mime::Mime = content_type
        .parse()
        .map_err(|_| ApiError::invalid_request("Invalid Content-Type header"))?;
    if parsed.type_() != mime::MULTIPART || parsed.subtype() != mime::FORM_DATA {
        return Err(ApiError::invalid_request(
            "Content-Type must be multipart/form-data",
        ));
    }
    parsed
        .get_param(mime::BOUNDARY)
        .map(|b| b.as_str().to_owned())
        .filter(|b| !b.is_empty())
        .ok_or_else(|| ApiError::invalid_request("Missing boundary in Content-Type"))
}

/// Parse a `multipart/form-data` body.
///
/// The first part named `file`, or the first part carrying a `filename`,
/// is the upload; every other part is a text field.
pub fn parse_multipart(body: &Bytes, boundary: &str) -> Result<MultipartForm, ApiError> {
    let delimiter = format!("--{boundary}");
    let mut fields = HashMap::new();
    let mut file = None;

    for range in part_ranges(body, delimiter.as_bytes()) {
        let part = &body[range.clone()];
        let Some(split) = find_bytes(part, b"\r\n\r\n") else {
            continue;
        };
        let headers = String::from_utf8_lossy(&part[..split]);
        let Some(disposition) = Disposition::parse(&headers) else {
            continue;
        };
        let content = body.slice(range.start + split + 4..range.end);

        if disposition.name == "file" || disposition.file_name.is_some() {
            if file.is_none() {
                file = Some(FormFile {
                    file_name: disposition.file_name.unwrap_or_default(),
                    content_type: header_value(&headers, "content-type"),
                    data: content,
                });
            }
        } else {
            fields.insert(
                disposition.name,
                String::from_utf8_lossy(&content).into_owned(),
            );
        }
    }

    let file = file
        .ok_or_else(|| ApiError::invalid_request("Missing file field in multipart form data"))?;
    Ok(MultipartForm { fields, file })
}

/// Content ranges of every part between the first delimiter and the
/// closing one, without the CRLFs that frame them.
fn part_ranges(body: &[u8], delimiter: &[u8]) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let Some(first) = find_bytes(body, delimiter) else {
        return ranges;
    };
    let mut cursor = first + delimiter.len();

    while !body[cursor..].starts_with(b"--") {
        let start = if body[cursor..].starts_with(b"\r\n") {
            cursor + 2
        } else {
            cursor
        };
        let Some(offset) = find_bytes(&body[start..], delimiter) else {
            break;
        };
        let next = start + offset;
        let end = if body[start..next].ends_with(b"\r\n") {
            next - 2
        } else {
            next
        };
        ranges.push(start..end);
        cursor = next + delimiter.len();
    }
    ranges
}

/// The `name` and `filename` parameters of a part's `Content-Disposition`.
#[derive(Debug)]
struct Disposition {
    name: String,
    file_name: Option<String>,
}

impl Disposition {
    fn parse(headers: &str) -> Option<Self> {
        let value = header_value(headers, "content-disposition")?;
        let mut name = None;
        let mut file_name = None;
        for param in value.split(';').skip(1) {
            let Some((key, raw)) = param.split_once('=') else {
                continue;
            };
            let raw = raw.trim();
            let unquoted = raw
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(raw)
                .to_owned();
            match key.trim().to_ascii_lowercase().as_str() {
                "name" => name = Some(unquoted),
                "filename" => file_name = Some(unquoted),
                _ => {}
            }
        }
        Some(Self {
            name: name?,
            file_name,
        })
    }
}

/// Value of a part header, matched case-insensitively.
fn header_value(headers: &str, name: &str) -> Option<String> {
    headers.split("\r\n").find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim()
            .eq_ignore_ascii_case(name)
            .then(|| value.trim().to_owned())
    })
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
