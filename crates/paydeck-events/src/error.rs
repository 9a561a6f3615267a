//! Error types for the push channel

/// Errors from push-channel operations. These are observability events, not
/// session failures: the driver logs them and decides whether to reconnect.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("channel connect failed: {0}")]
    Connect(String),

    #[error("invalid channel url: {0}")]
    Url(String),
}

/// Result alias for channel operations.
pub type Result<T> = std::result::Result<T, ChannelError>;
