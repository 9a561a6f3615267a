//! Wire types for the endpoint facades
//!
//! All shapes follow the platform's camelCase JSON. Timestamps are ISO-8601
//! strings as the server sends them; amounts are plain JSON numbers in the
//! account currency.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use paydeck_auth::AuthenticatedUser;
pub use paydeck_events::TransactionStatus;

/// Partial customer profile update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// A prepaid platform account attached to the customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub name: String,
    pub is_mutable: bool,
    pub is_refillable: bool,
    #[serde(default)]
    pub cards: Vec<AccountCard>,
    #[serde(default)]
    pub balance: Vec<AccountBalance>,
    #[serde(default)]
    pub transactions: Vec<AccountTransaction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountCard {
    pub id: String,
    pub number: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountBalance {
    pub currency: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountTransaction {
    #[serde(default)]
    pub id: Option<String>,
    pub date: String,
    pub amount: f64,
    pub currency: String,
    pub status: TransactionStatus,
}

/// A refill transaction as returned by the payments area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub client_id: u64,
    pub amount: f64,
    pub currency: String,
    pub status: TransactionStatus,
    pub date: String,
}

/// Service catalog node: nested categories with leaf services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub services: Vec<ServiceItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceItem {
    pub id: u64,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub picture: Option<String>,
    pub price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoyaltyRuleType {
    #[serde(rename = "FIXED")]
    Fixed,
    #[serde(rename = "PERCENT")]
    Percent,
}

/// One bonus-accrual rule: applies to refill amounts in `[min, max)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyRule {
    pub id: u64,
    #[serde(rename = "type")]
    pub rule_type: LoyaltyRuleType,
    pub min: f64,
    #[serde(default)]
    pub max: Option<f64>,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityKind {
    #[serde(rename = "PURCHASE")]
    Purchase,
    #[serde(rename = "REFILL")]
    Refill,
    #[serde(rename = "BONUS_ACCRUAL")]
    BonusAccrual,
}

/// One row of the customer's activity feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEvent {
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub timestamp: String,
    #[serde(default)]
    pub payload: Value,
}

/// Parameters for creating a platform account.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccount {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_mutable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_refillable: Option<bool>,
}

/// Parameters for attaching an existing account by its claim code.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachAccount {
    #[serde(flatten)]
    pub account: CreateAccount,
    pub code: String,
}

/// Create an account and immediately refill it through a payment gateway.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRefilledAccount {
    #[serde(flatten)]
    pub account: CreateAccount,
    pub amount: f64,
    pub currency: String,
    pub callback_url: String,
}

/// Parameters for refilling a card through a payment gateway.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefillCard {
    pub amount: f64,
    pub currency: String,
    pub account_id: String,
    pub callback_url: String,
}

/// Where to send the customer to complete a gateway payment.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRedirect {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedAccount {
    pub account_id: String,
}
