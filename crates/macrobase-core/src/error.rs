//! Error types for the Macrobase core.

/// Core error type for Macrobase infrastructure.
#[derive(Debug, thiserror::Error)]
pub enum MacrobaseError {
    /// Unknown resolution policy name.
    #[error("invalid resolution policy: {0} (expected `insertion-order` or `most-specific`)")]
    InvalidPolicy(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience result type for Macrobase core operations.
pub type MacrobaseResult<T> = Result<T, MacrobaseError>;
