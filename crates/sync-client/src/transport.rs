//! Adapter implementing the core transport seam over the HTTP client.

use async_trait::async_trait;

use mealtrack_core::errors::Result;
use mealtrack_core::sync::{SyncBatchRequest, SyncBatchResponse, SyncTransport};

use crate::client::MealSyncClient;

/// Binds a client and an access token to the engine's transport seam. Token
/// acquisition/refresh is the host application's concern; the token is
/// accepted here as an opaque string.
pub struct HttpSyncTransport {
    client: MealSyncClient,
    access_token: String,
}

impl HttpSyncTransport {
    pub fn new(client: MealSyncClient, access_token: impl Into<String>) -> Self {
        Self {
            client,
            access_token: access_token.into(),
        }
    }
}

#[async_trait]
impl SyncTransport for HttpSyncTransport {
    async fn push_batch(&self, request: SyncBatchRequest) -> Result<SyncBatchResponse> {
        self.client
            .push_meals(&self.access_token, &request)
            .await
            .map_err(mealtrack_core::Error::from)
    }
}
