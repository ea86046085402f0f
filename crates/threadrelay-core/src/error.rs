//! Error types for the `threadrelay` core library.

use thiserror::Error;

/// Result type alias using the core [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A sanitizer rule pattern failed to compile
    #[error("Invalid sanitizer pattern: {0}")]
    Pattern(#[from] regex::Error),
}
