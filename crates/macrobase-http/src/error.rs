//! Errors raised while decoding an HTTP request into a [`RequestView`](crate::RequestView).

/// A request body that could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The body claimed to be JSON but did not parse.
    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),

    /// The JSON body parsed but is not an object.
    #[error("JSON body must be an object")]
    JsonNotObject,

    /// The multipart body or its boundary is malformed.
    #[error("invalid multipart body: {0}")]
    Multipart(String),

    /// The transport failed while the body was being read.
    #[error("failed to read request body: {0}")]
    Body(String),
}
