//! Error types for xml-lite.

use thiserror::Error;

/// Result type alias for xml-lite operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building, querying, or serializing documents.
#[derive(Error, Debug)]
pub enum Error {
    /// A requested element, attribute, or child does not exist.
    ///
    /// Recoverable; every throwing lookup has a `find_*` twin that returns
    /// `Option` instead.
    #[error("not found: {0}")]
    NotFound(String),

    /// Structural parse error: mismatched tags, an unresolved namespace
    /// prefix, multiple roots, or truncated input. Fatal to the parse.
    #[error("malformed document at byte {position}: {message}")]
    MalformedDocument {
        /// Description of the structural problem.
        message: String,
        /// Byte offset into the input where the problem was detected,
        /// 0 when the event source carries no position data.
        position: u64,
    },

    /// The operation is not valid for the current tree state, e.g. removing
    /// an element from the wrong parent or fetching the root of an empty
    /// document. Fatal to the call, not to the process.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// A byte sequence could not be decoded with the declared encoding.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// I/O error from the stream boundary.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Builds a `MalformedDocument` error with position context.
    pub fn malformed(message: impl Into<String>, position: u64) -> Self {
        Error::MalformedDocument {
            message: message.into(),
            position,
        }
    }
}
