//! Error types for bioc.

use thiserror::Error;

/// Result type for bioc operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for bioc operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The serialized collection is malformed, truncated, or empty.
    #[error("Malformed stream: {0}")]
    StreamFormat(String),

    /// A read was attempted after the reader was closed.
    #[error("Reader is closed")]
    ClosedStream,

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A structural invariant of the document tree is violated.
    #[error("Validation failed: {0}")]
    Validation(#[from] crate::validate::ValidationError),

    /// XML tokenizer error.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a stream format error.
    #[must_use]
    pub fn stream_format(msg: impl Into<String>) -> Self {
        Self::StreamFormat(msg.into())
    }

    /// Create an invalid input error.
    #[must_use]
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
