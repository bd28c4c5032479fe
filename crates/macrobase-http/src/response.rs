//! Response construction.
//!
//! Every response built by a [`ResponseFactory`] carries the
//! [`CORRELATION_HEADER`] set to the request id of the dispatch that
//! created the factory. Four shapes are supported: raw bytes, text, JSON,
//! and file contents.

use std::path::Path;

use bytes::Bytes;
use http::StatusCode;
use http::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use macrobase_core::{Failure, Resolution};

use crate::body::ResponseBody;

/// Header carrying the per-request correlation id.
pub const CORRELATION_HEADER: &str = "x-cross-request-id";

/// An endpoint response.
pub type Response = http::Response<ResponseBody>;

/// Status, extra headers, and content type for raw and text responses.
#[derive(Debug, Clone)]
pub struct ReplyOptions {
    /// Response status; defaults to 200.
    pub status: StatusCode,
    /// Extra headers.
    pub headers: HeaderMap,
    /// Content type; each constructor has its own default.
    pub content_type: Option<mime::Mime>,
}

impl Default for ReplyOptions {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            content_type: None,
        }
    }
}

impl ReplyOptions {
    /// Options with the given status.
    #[must_use]
    pub fn status(status: StatusCode) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    /// Set the extra headers.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Set the content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: mime::Mime) -> Self {
        self.content_type = Some(content_type);
        self
    }
}

/// Arguments for a JSON response.
///
/// With `data` set the payload is sent verbatim; otherwise the body is
/// `{"code": error_code or status, "message": message or status phrase}`.
#[derive(Debug, Clone)]
pub struct JsonReply {
    /// Response status; defaults to 200.
    pub status: StatusCode,
    /// Message for the envelope.
    pub message: Option<String>,
    /// Payload sent verbatim.
    pub data: Option<serde_json::Value>,
    /// Application error code for the envelope.
    pub error_code: Option<i64>,
    /// Extra headers.
    pub headers: HeaderMap,
}

impl Default for JsonReply {
    fn default() -> Self {
        Self::new(StatusCode::OK)
    }
}

impl JsonReply {
    /// Reply with the given status.
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            message: None,
            data: None,
            error_code: None,
            headers: HeaderMap::new(),
        }
    }

    /// 200 reply with a verbatim payload.
    #[must_use]
    pub fn data(data: serde_json::Value) -> Self {
        Self::new(StatusCode::OK).with_data(data)
    }

    /// Set the envelope message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Set the verbatim payload.
    #[must_use]
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Set the envelope error code.
    #[must_use]
    pub fn with_error_code(mut self, error_code: i64) -> Self {
        self.error_code = Some(error_code);
        self
    }

    /// Set the extra headers.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// The JSON document this reply renders to.
    #[must_use]
    pub fn payload(&self) -> serde_json::Value {
        if let Some(data) = &self.data {
            return data.clone();
        }
        let code = self
            .error_code
            .unwrap_or_else(|| i64::from(self.status.as_u16()));
        let message = self
            .message
            .clone()
            .unwrap_or_else(|| standard_phrase(self.status).to_owned());
        serde_json::json!({ "code": code, "message": message })
    }
}

impl From<Resolution> for JsonReply {
    fn from(resolution: Resolution) -> Self {
        Self {
            status: resolution.status,
            message: resolution.message,
            data: resolution.data,
            error_code: resolution.error_code,
            headers: HeaderMap::new(),
        }
    }
}

/// The canonical reason phrase for `status`.
#[must_use]
pub fn standard_phrase(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Unknown Status")
}

/// Builds responses stamped with one request's correlation id.
#[derive(Debug, Clone)]
pub struct ResponseFactory {
    request_id: String,
}

impl ResponseFactory {
    /// Create a factory for `request_id`.
    #[must_use]
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
        }
    }

    /// The correlation id stamped on every response.
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Raw bytes, `application/octet-stream` unless overridden.
    #[must_use]
    pub fn raw(&self, data: impl Into<Bytes>, options: ReplyOptions) -> Response {
        let content_type = options
            .content_type
            .unwrap_or(mime::APPLICATION_OCTET_STREAM);
        self.finish(
            options.status,
            options.headers,
            &content_type,
            ResponseBody::from_bytes(data),
        )
    }

    /// UTF-8 text, `text/plain; charset=utf-8` unless overridden.
    #[must_use]
    pub fn text(&self, text: impl Into<String>, options: ReplyOptions) -> Response {
        let content_type = options.content_type.unwrap_or(mime::TEXT_PLAIN_UTF_8);
        self.finish(
            options.status,
            options.headers,
            &content_type,
            ResponseBody::from_string(text),
        )
    }

    /// JSON document; see [`JsonReply`] for the body shape.
    #[must_use]
    pub fn json(&self, reply: JsonReply) -> Response {
        let payload = reply.payload().to_string();
        self.finish(
            reply.status,
            reply.headers,
            &mime::APPLICATION_JSON,
            ResponseBody::from_string(payload),
        )
    }

    /// File contents with a content type guessed from the extension.
    pub async fn file(
        &self,
        path: impl AsRef<Path>,
        headers: HeaderMap,
    ) -> Result<Response, Failure> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;
        tracing::debug!(path = %path.display(), bytes = data.len(), "serving file");
        Ok(self.finish(
            StatusCode::OK,
            headers,
            &guess_content_type(path),
            ResponseBody::from_bytes(data),
        ))
    }

    fn finish(
        &self,
        status: StatusCode,
        headers: HeaderMap,
        content_type: &mime::Mime,
        body: ResponseBody,
    ) -> Response {
        let mut response = http::Response::new(body);
        *response.status_mut() = status;

        let out = response.headers_mut();
        out.extend(headers);
        if let Ok(hv) = HeaderValue::from_str(content_type.as_ref()) {
            out.insert(CONTENT_TYPE, hv);
        }
        if let Ok(hv) = HeaderValue::from_str(&self.request_id) {
            out.insert(CORRELATION_HEADER, hv);
        }

        response
    }
}

/// Guess a content type from a file extension.
fn guess_content_type(path: &Path) -> mime::Mime {
    mime_guess::from_path(path).first_or_octet_stream()
}
