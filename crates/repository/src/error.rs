//! Error types for repository operations.

use protocol::ProtocolError;
use thiserror::Error;

use crate::host::HostError;

/// Errors surfaced to callers of the repository.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The listing could not be produced. The cause is logged, not returned.
    #[error("file list is unavailable")]
    EmptyFileList,

    /// The source token failed to decode or a field failed validation.
    #[error("invalid source token: {0}")]
    InvalidToken(#[source] ProtocolError),

    /// The destination path or file name failed validation.
    #[error("invalid destination: {0}")]
    InvalidDestination(#[source] ProtocolError),

    /// The context named by a token does not exist.
    #[error("context not found: {0}")]
    ContextNotFound(u64),

    /// The source file named by a token does not exist.
    #[error("source file not found: {0}")]
    SourceNotFound(String),

    /// The host failed.
    #[error(transparent)]
    Host(#[from] HostError),
}

/// Result type alias for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;
