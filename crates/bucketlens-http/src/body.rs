//! Response body type.
//!
//! [`ApiResponseBody`] covers the three shapes BucketLens sends:
//!
//! - **Buffered**: JSON payloads and error envelopes.
//! - **Streaming**: folder archives, fed chunk by chunk through a bounded
//!   channel. An `Err` item ends the body with an error, which makes hyper
//!   abort the connection; the client sees a truncated download.
//! - **Empty**: preflight answers and bodiless confirmations.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body::Frame;
use http_body_util::Full;
use tokio::sync::mpsc;

/// HTTP response body used by every BucketLens response.
#[derive(Debug, Default)]
pub enum ApiResponseBody {
    /// Fully buffered content.
    Buffered(Full<Bytes>),
    /// Chunks produced by a background task.
    Streaming(mpsc::Receiver<io::Result<Bytes>>),
    /// No content.
    #[default]
    Empty,
}

impl ApiResponseBody {
    /// Create a buffered body from bytes.
    #[must_use]
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self::Buffered(Full::new(data.into()))
    }

    /// Create a buffered body from a UTF-8 string.
    #[must_use]
    pub fn from_string(s: impl Into<String>) -> Self {
        Self::Buffered(Full::new(Bytes::from(s.into())))
    }

    /// Create a streamed body from the receiving half of a chunk channel.
    #[must_use]
    pub fn from_stream(rx: mpsc::Receiver<io::Result<Bytes>>) -> Self {
        Self::Streaming(rx)
    }

    /// Create an empty body.
    #[must_use]
    pub fn empty() -> Self {
        Self::Empty
    }
}

impl http_body::Body for ApiResponseBody {
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.get_mut() {
            Self::Buffered(full) => Pin::new(full)
                .poll_frame(cx)
                .map_err(|never| match never {}),
            Self::Streaming(rx) => rx
                .poll_recv(cx)
                .map(|item| item.map(|chunk| chunk.map(Frame::data))),
            Self::Empty => Poll::Ready(None),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            Self::Buffered(full) => full.is_end_stream(),
            Self::Streaming(_) => false,
            Self::Empty => true,
        }
    }

    fn size_hint(&self) -> http_body::SizeHint {
        match self {
            Self::Buffered(full) => full.size_hint(),
            Self::Streaming(_) => http_body::SizeHint::default(),
            Self::Empty => http_body::SizeHint::with_exact(0),
        }
    }
}
