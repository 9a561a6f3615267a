//! Loyalty program resource area

use std::sync::Arc;

use paydeck_transport::{Result, Transport, decode};
use serde_json::json;

use crate::types::LoyaltyRule;

const PREFIX: &str = "/loyalty";

pub struct LoyaltyApi {
    transport: Arc<Transport>,
}

impl LoyaltyApi {
    pub(crate) fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    /// The configured bonus-accrual rules.
    pub async fn rules(&self) -> Result<Vec<LoyaltyRule>> {
        decode(self.transport.get(&format!("{PREFIX}/rules")).await?)
    }

    /// The bonus amount the platform would grant for a given refill amount.
    pub async fn bonus_amount(&self, amount: f64) -> Result<f64> {
        decode(
            self.transport
                .post(&format!("{PREFIX}/calc"), &json!({ "amount": amount }))
                .await?,
        )
    }
}
