//! Error types for document parsing in zrak-types.

use thiserror::Error;

/// Errors that can occur when tokenizing an ARSO feed document.
///
/// Malformed individual fields never produce an error; they degrade to absent
/// values. Only a structurally broken document is reported.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseError {
    /// The XML tokenizer rejected the document.
    #[error("Malformed XML at byte {position}: {message}")]
    MalformedXml {
        /// Byte offset reported by the tokenizer.
        position: u64,
        /// Tokenizer message.
        message: String,
    },

    /// The document ended while elements were still open.
    #[error("Unexpected end of document: <{element}> was never closed")]
    UnterminatedElement {
        /// Name of the innermost open element.
        element: String,
    },
}

impl ParseError {
    /// Create a tokenizer error at the given position.
    pub fn malformed(position: u64, message: impl Into<String>) -> Self {
        Self::MalformedXml {
            position,
            message: message.into(),
        }
    }
}

/// Result type alias using zrak-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
