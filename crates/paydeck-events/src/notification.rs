//! Typed server-pushed notifications
//!
//! Wire form: `{"event": "<kebab-case kind>", "payload": {...}}`. Some
//! gateway paths double-encode the payload as a JSON string; `parse`
//! normalizes that before typed decoding, so subscribers always receive
//! structured payloads and never raw text.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle of a refill transaction as the platform reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    /// Initial status at creation
    #[serde(rename = "CREATED")]
    Created,
    /// Payment gateway request in progress
    #[serde(rename = "PG_AWAITING")]
    AwaitingPaymentGate,
    #[serde(rename = "PG_APPROVED")]
    ApprovedByPaymentGate,
    /// Funds captured by the gateway
    #[serde(rename = "PG_COMPLETED")]
    CompletedByPaymentGate,
    /// Merchant-side reversal
    #[serde(rename = "PG_REVERSED")]
    ReversedByPaymentGate,
    #[serde(rename = "PG_REFUNDED")]
    RefundedByPaymentGate,
    #[serde(rename = "PG_REJECTED")]
    RejectedByPaymentGate,
    /// Gateway done, platform-side processing queued
    #[serde(rename = "BACKEND_AWAITING")]
    AwaitingBackend,
    #[serde(rename = "BACKEND_REJECTED")]
    RejectedByBackend,
    /// Funds captured and the account credited
    #[serde(rename = "COMPLETED")]
    Completed,
    /// Abandoned by the customer or expired
    #[serde(rename = "ABORTED")]
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionStatusChange {
    pub transaction_id: String,
    pub status: TransactionStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefillOutcome {
    pub transaction_id: String,
    pub account_id: String,
    pub amount: f64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefillFailure {
    pub transaction_id: String,
    #[serde(default)]
    pub reason: Option<String>,
}

/// A server-pushed notification with its decoded payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum Notification {
    TransactionStatusChanged(TransactionStatusChange),
    RefillSucceeded(RefillOutcome),
    RefillFailedByGateway(RefillFailure),
    RefillFailedByBackend(RefillFailure),
}

/// Notification kind without payload — the subscription key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    TransactionStatusChanged,
    RefillSucceeded,
    RefillFailedByGateway,
    RefillFailedByBackend,
}

impl Notification {
    pub fn kind(&self) -> NotificationKind {
        match self {
            Notification::TransactionStatusChanged(_) => NotificationKind::TransactionStatusChanged,
            Notification::RefillSucceeded(_) => NotificationKind::RefillSucceeded,
            Notification::RefillFailedByGateway(_) => NotificationKind::RefillFailedByGateway,
            Notification::RefillFailedByBackend(_) => NotificationKind::RefillFailedByBackend,
        }
    }

    /// Parse one wire frame, decoding a string-encoded payload first when
    /// the server sent one.
    pub fn parse(text: &str) -> std::result::Result<Notification, serde_json::Error> {
        let mut value: Value = serde_json::from_str(text)?;
        if let Some(payload) = value.get_mut("payload") {
            if let Some(encoded) = payload.as_str() {
                *payload = serde_json::from_str(encoded)?;
            }
        }
        serde_json::from_value(value)
    }
}
