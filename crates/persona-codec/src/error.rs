//! Codec error types.

use thiserror::Error;

/// Errors from codec selection, parsing and serialization.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// No codec is registered under this name.
    #[error("unknown codec: {0}")]
    UnknownCodec(String),

    /// Text could not be decoded.
    #[error("{codec} parse error: {message}")]
    Parse {
        /// Codec that failed.
        codec: String,
        /// Decoder message.
        message: String,
    },

    /// A document could not be encoded.
    #[error("{codec} serialization error: {message}")]
    Serialize {
        /// Codec that failed.
        codec: String,
        /// Encoder message.
        message: String,
    },
}

impl CodecError {
    pub(crate) fn parse(codec: &str, message: impl Into<String>) -> Self {
        Self::Parse {
            codec: codec.to_owned(),
            message: message.into(),
        }
    }

    pub(crate) fn serialize(codec: &str, message: impl Into<String>) -> Self {
        Self::Serialize {
            codec: codec.to_owned(),
            message: message.into(),
        }
    }
}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
