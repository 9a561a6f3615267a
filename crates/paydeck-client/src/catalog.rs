//! Service catalog resource area

use std::sync::Arc;

use paydeck_transport::{Result, Transport, decode};
use serde_json::json;

use crate::types::Category;

const PREFIX: &str = "/services";

pub struct CatalogApi {
    transport: Arc<Transport>,
}

impl CatalogApi {
    pub(crate) fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }

    /// Load the service tree rooted at the given category.
    pub async fn tree(&self, root_category_id: u64) -> Result<Category> {
        decode(
            self.transport
                .post(&format!("{PREFIX}/tree"), &json!({ "rootCategoryId": root_category_id }))
                .await?,
        )
    }
}
