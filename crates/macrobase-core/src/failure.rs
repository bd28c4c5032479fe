//! Failures raised by hooks and verb handlers.
//!
//! Anything that implements [`Classified`] converts into a [`Failure`] with
//! `?`, so handler code reads like ordinary fallible Rust while the registry
//! still sees the error's class.

use std::error::Error as StdError;
use std::fmt;

use crate::class::{ErrorClass, HTTP_ERROR, IO_ERROR, JSON_ERROR, ROUTING_ERROR};

/// An error type that belongs to an [`ErrorClass`].
pub trait Classified: StdError + Send + Sync + 'static {
    /// The runtime class of this error.
    fn class(&self) -> &'static ErrorClass;
}

/// A captured hook or handler failure together with its runtime class.
#[derive(Debug)]
pub struct Failure {
    class: &'static ErrorClass,
    inner: Box<dyn StdError + Send + Sync>,
}

impl Failure {
    /// Capture a classified error.
    #[must_use]
    pub fn new<E: Classified>(error: E) -> Self {
        Self {
            class: error.class(),
            inner: Box::new(error),
        }
    }

    /// Capture an arbitrary error under an explicit class.
    #[must_use]
    pub fn with_class(
        class: &'static ErrorClass,
        error: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        Self {
            class,
            inner: error.into(),
        }
    }

    /// The runtime class of the captured error.
    #[must_use]
    pub fn class(&self) -> &'static ErrorClass {
        self.class
    }

    /// Returns `true` if the captured error is of class `class` or a subclass.
    #[must_use]
    pub fn is_a(&self, class: &ErrorClass) -> bool {
        self.class.is_a(class)
    }

    /// Borrow the captured error as its concrete type.
    #[must_use]
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.inner.downcast_ref::<E>()
    }

    /// Borrow the captured error as a trait object.
    #[must_use]
    pub fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.inner.as_ref()
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl<E: Classified> From<E> for Failure {
    fn from(error: E) -> Self {
        Self::new(error)
    }
}

/// A failure carrying the HTTP status it should be answered with.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct HttpError {
    /// Status code for the response.
    pub status: http::StatusCode,
    /// Human-readable message.
    pub message: String,
}

impl HttpError {
    /// Create a new `HttpError`.
    #[must_use]
    pub fn new(status: http::StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// 400 Bad Request.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(http::StatusCode::BAD_REQUEST, message)
    }

    /// 401 Unauthorized.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(http::StatusCode::UNAUTHORIZED, message)
    }

    /// 403 Forbidden.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(http::StatusCode::FORBIDDEN, message)
    }

    /// 404 Not Found.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(http::StatusCode::NOT_FOUND, message)
    }
}

impl Classified for HttpError {
    fn class(&self) -> &'static ErrorClass {
        &HTTP_ERROR
    }
}

/// An internal routing failure; always answered with 500.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct RoutingError(pub String);

impl RoutingError {
    /// Status code every routing error is answered with.
    pub const STATUS: http::StatusCode = http::StatusCode::INTERNAL_SERVER_ERROR;
}

impl Classified for RoutingError {
    fn class(&self) -> &'static ErrorClass {
        &ROUTING_ERROR
    }
}

impl Classified for std::io::Error {
    fn class(&self) -> &'static ErrorClass {
        &IO_ERROR
    }
}

impl Classified for serde_json::Error {
    fn class(&self) -> &'static ErrorClass {
        &JSON_ERROR
    }
}
