//! Where snapshots come from.

use async_trait::async_trait;
use client::models::DatasetRow;
use client::{ClientError, PlatformClient};

/// Fetches a full collection by identifier.
///
/// `Ok(None)` means the service answered but sent no usable row sequence.
#[async_trait]
pub trait CollectionSource: Send + Sync {
    async fn fetch_collection(
        &self,
        collection_id: &str,
    ) -> Result<Option<Vec<DatasetRow>>, ClientError>;
}

#[async_trait]
impl CollectionSource for PlatformClient {
    async fn fetch_collection(
        &self,
        collection_id: &str,
    ) -> Result<Option<Vec<DatasetRow>>, ClientError> {
        client::api::datasets::fetch_dataset_rows(self, collection_id).await
    }
}
