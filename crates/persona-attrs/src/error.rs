//! Attribute store error types.

use thiserror::Error;

/// Errors raised while building a schema or registering attributes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AttrError {
    /// The key is already registered in this store or schema.
    #[error("attribute already registered: {0}")]
    Duplicate(String),

    /// The key is empty.
    #[error("invalid attribute key: {0:?}")]
    InvalidKey(String),

    /// A schema referenced a type name that is neither built in nor registered.
    #[error("unknown attribute type '{type_name}' for key '{key}'")]
    UnknownType {
        /// Key whose definition referenced the type.
        key: String,
        /// The unresolved type name.
        type_name: String,
    },

    /// A schema document did not have the expected shape.
    #[error("malformed schema entry '{key}': {message}")]
    MalformedSchema {
        /// Key of the offending entry (empty for the document root).
        key: String,
        /// What was wrong with it.
        message: String,
    },
}

/// Why a single attribute write was refused.
///
/// Rejections are ordinary outcomes, not faults: the store is left exactly
/// as it was before the call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// No attribute is registered under this key.
    #[error("unknown attribute: {0}")]
    Unknown(String),

    /// The attribute is read-only and can only change through a reset.
    #[error("attribute is read-only: {0}")]
    ReadOnly(String),

    /// The attribute's validator refused the candidate value.
    #[error("invalid value for '{key}': {reason}")]
    Invalid {
        /// Attribute key.
        key: String,
        /// Reason reported by the validator.
        reason: String,
    },
}

impl Rejection {
    /// Key the rejected write targeted.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Unknown(key) | Self::ReadOnly(key) | Self::Invalid { key, .. } => key,
        }
    }
}

/// Result type for schema and registration operations.
pub type AttrResult<T> = Result<T, AttrError>;
