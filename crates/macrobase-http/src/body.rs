//! Response body type shared by every endpoint.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body::{Frame, SizeHint};
use http_body_util::Full;

/// Body of an endpoint response.
///
/// Payloads are buffered before the response leaves the endpoint; file
/// responses are read into memory by the factory. `HEAD` responses are
/// sent [`Empty`](ResponseBody::Empty).
#[derive(Debug, Default)]
pub enum ResponseBody {
    /// A fully buffered body.
    Buffered(Full<Bytes>),
    /// No body.
    #[default]
    Empty,
}

impl ResponseBody {
    /// Buffered body from raw bytes.
    #[must_use]
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self::Buffered(Full::new(data.into()))
    }

    /// Buffered body from a UTF-8 string.
    #[must_use]
    pub fn from_string(s: impl Into<String>) -> Self {
        Self::from_bytes(s.into())
    }

    /// Empty body.
    #[must_use]
    pub fn empty() -> Self {
        Self::Empty
    }

    /// Exact length in bytes, as reported by the size hint.
    #[must_use]
    pub fn len(&self) -> u64 {
        http_body::Body::size_hint(self).exact().unwrap_or_default()
    }

    /// Returns `true` if no bytes remain to be sent.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Bytes> for ResponseBody {
    fn from(data: Bytes) -> Self {
        Self::from_bytes(data)
    }
}

impl From<String> for ResponseBody {
    fn from(s: String) -> Self {
        Self::from_string(s)
    }
}

impl http_body::Body for ResponseBody {
    type Data = Bytes;
    type Error = std::convert::Infallible;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.get_mut() {
            Self::Buffered(full) => Pin::new(full).poll_frame(cx),
            Self::Empty => Poll::Ready(None),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            Self::Buffered(full) => full.is_end_stream(),
            Self::Empty => true,
        }
    }

    fn size_hint(&self) -> SizeHint {
        match self {
            Self::Buffered(full) => full.size_hint(),
            Self::Empty => SizeHint::with_exact(0),
        }
    }
}
