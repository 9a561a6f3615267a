//! Payments resource area: card refills and transaction lookups

use std::sync::Arc;

use paydeck_transport::{Result, Transport, decode};

use crate::types::{PaymentRedirect, RefillCard, Transaction};

const PREFIX: &str = "/payment";

pub struct PaymentsApi {
    transport: Arc<Transport>,
}

impl PaymentsApi {
    pub(crate) fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    /// Start a card refill through the given payment gateway. Returns the
    /// redirect URL where the customer completes the payment; the outcome
    /// arrives later as a push notification.
    pub async fn refill_card(
        &self,
        params: &RefillCard,
        gateway_id: &str,
    ) -> Result<PaymentRedirect> {
        decode(
            self.transport
                .post(&format!("{PREFIX}/refill-card/{gateway_id}"), params)
                .await?,
        )
    }

    /// Look up one refill transaction by id.
    pub async fn transaction(&self, transaction_id: &str) -> Result<Transaction> {
        decode(
            self.transport
                .get(&format!("{PREFIX}/transaction/{transaction_id}"))
                .await?,
        )
    }
}
