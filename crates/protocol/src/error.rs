//! Error types for the protocol crate.

use thiserror::Error;

/// Protocol error type covering token and field failures.
#[derive(Debug, Error)]
pub enum ProtocolError {
    // Token errors
    /// Token is not valid URL-safe base64.
    #[error("invalid token encoding: {0}")]
    TokenEncoding(String),

    /// Token exceeds the maximum accepted length.
    #[error("token too long: {len} characters exceeds maximum of {max}")]
    TokenTooLong {
        /// Actual token length.
        len: usize,
        /// Maximum accepted length.
        max: usize,
    },

    /// Token has invalid magic bytes.
    #[error("invalid token magic: expected {expected:?}, got {got:?}")]
    InvalidTokenMagic {
        /// Expected magic value.
        expected: [u8; 4],
        /// Actual magic value received.
        got: Vec<u8>,
    },

    /// Token was produced by an unknown codec version.
    #[error("unsupported token version: {0}")]
    UnsupportedVersion(u8),

    /// Token record does not match the expected shape.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    // Field errors
    /// A decoded or caller-supplied field failed its syntax check.
    #[error("invalid {field}: {reason}")]
    InvalidField {
        /// Name of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl ProtocolError {
    /// Shorthand for an [`ProtocolError::InvalidField`] error.
    pub fn invalid_field(field: &'static str, reason: impl Into<String>) -> Self {
        ProtocolError::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

/// Result type alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

impl From<base64::DecodeError> for ProtocolError {
    fn from(err: base64::DecodeError) -> Self {
        ProtocolError::TokenEncoding(err.to_string())
    }
}
