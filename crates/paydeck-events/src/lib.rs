//! Server-pushed notifications for the Paydeck SDK
//!
//! A single websocket channel exists only while a session is active: the
//! driver opens it on `SessionEvent::Authenticated` (carrying the session
//! credential as a connection parameter) and tears it down on `LoggedOut`.
//! Subscriptions live in a registry independent of the channel, so handlers
//! registered before any connection exists are serviced once one opens.
//!
//! A degraded channel never degrades the session: connection failures are
//! logged and counted, reconnection is bounded, and request/response calls
//! keep working either way.

pub mod channel;
pub mod error;
pub mod notification;
pub mod registry;

pub use channel::{ChannelConfig, spawn_driver};
pub use error::{ChannelError, Result};
pub use notification::{
    Notification, NotificationKind, RefillFailure, RefillOutcome, TransactionStatus,
    TransactionStatusChange,
};
pub use registry::SubscriptionRegistry;
