//! Customer resource area: profile, platform accounts, activity

use std::sync::Arc;

use paydeck_transport::{Result, Transport, decode};
use serde_json::json;

use crate::types::{
    Account, ActivityEvent, AttachAccount, CreateAccount, CreateRefilledAccount, CreatedAccount,
    CustomerUpdate, PaymentRedirect,
};

const PREFIX: &str = "/client";

/// One operation per endpoint; every failure is the pipeline's four-way
/// classification, nothing is retried here.
pub struct CustomersApi {
    transport: Arc<Transport>,
}

impl CustomersApi {
    pub(crate) fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    /// Whether an account is already registered for this phone number.
    pub async fn exists_with_phone(&self, phone: &str) -> Result<bool> {
        decode(
            self.transport
                .post(&format!("{PREFIX}/exists-with-phone"), &json!({ "phone": phone }))
                .await?,
        )
    }

    /// Verify a card number is registered with the platform.
    pub async fn check_card(&self, card: &str) -> Result<()> {
        self.transport
            .post(&format!("{PREFIX}/check-card"), &json!({ "card": card }))
            .await
            .map(|_| ())
    }

    /// Update the authenticated customer's profile.
    pub async fn update(&self, update: &CustomerUpdate) -> Result<()> {
        self.transport
            .post(&format!("{PREFIX}/update"), update)
            .await
            .map(|_| ())
    }

    /// Platform accounts attached to the authenticated customer.
    pub async fn accounts(&self) -> Result<Vec<Account>> {
        decode(self.transport.get(&format!("{PREFIX}/accounts")).await?)
    }

    /// Attach an existing platform account by its claim code.
    pub async fn attach_account(&self, params: &AttachAccount) -> Result<()> {
        self.transport
            .post(&format!("{PREFIX}/accounts/attach"), params)
            .await
            .map(|_| ())
    }

    /// Create a fresh platform account for the customer.
    pub async fn create_account(&self, params: &CreateAccount) -> Result<CreatedAccount> {
        decode(
            self.transport
                .post(&format!("{PREFIX}/accounts/create"), params)
                .await?,
        )
    }

    /// Create an account, open a card in it, and hand back the gateway
    /// redirect that completes the initial refill.
    pub async fn create_refilled_account(
        &self,
        params: &CreateRefilledAccount,
        gateway_id: &str,
    ) -> Result<PaymentRedirect> {
        decode(
            self.transport
                .post(&format!("{PREFIX}/accounts/create-refilled/{gateway_id}"), params)
                .await?,
        )
    }

    /// The customer's activity feed.
    pub async fn activity(&self) -> Result<Vec<ActivityEvent>> {
        decode(self.transport.get(&format!("{PREFIX}/activity")).await?)
    }
}
