//! Failure taxonomy for the request pipeline

/// Outcome classification for a single request, in evaluation order.
///
/// The four kinds are deliberately disjoint: a `Protocol` failure means the
/// server (or an intermediary) did respond, which matters when diagnosing
/// partial outages, while `Application` means the server answered 2xx but
/// embedded a business error in the payload. Collapsing these into one
/// "it failed" value loses exactly the information a caller needs to decide
/// between "retry", "re-enter credentials", and "show the business error".
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// The connection could not be established or died before a response.
    #[error("transport failure: {0}")]
    Transport(String),

    /// A response arrived with a non-success status code.
    #[error("server responded with status {0}")]
    Protocol(u16),

    /// A success response whose body could not be parsed.
    #[error("malformed response body: {0}")]
    Decode(String),

    /// A success response carrying a server-supplied error code.
    #[error("application error: {0}")]
    Application(String),
}

/// Result alias for pipeline operations.
pub type Result<T> = std::result::Result<T, RequestError>;
