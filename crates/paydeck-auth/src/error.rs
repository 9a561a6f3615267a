//! Error types for session operations

use paydeck_transport::RequestError;

/// Errors from session and storage operations.
///
/// Pipeline failures pass through unchanged so callers keep the full
/// four-way classification; the variants below cover what the session layer
/// adds on top of it.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("verification code already requested, retry in {remaining_secs}s")]
    AlreadyCoolingDown { remaining_secs: u64 },

    #[error("no authenticated user")]
    NotAuthenticated,

    #[error("credential parse error: {0}")]
    CredentialParse(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// Result alias for session operations.
pub type Result<T> = std::result::Result<T, Error>;
