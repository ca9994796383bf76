use crate::config::StorageAccountConfig;
use crate::domain::model::{BlobPage, ContainerRef, ContinuationState};
use crate::utils::error::EnumerationCause;
use async_trait::async_trait;
use std::time::Duration;

/// One bounded "list page" call against a blob service.
#[async_trait]
pub trait BlobPageSource: Send + Sync {
    async fn list_page(
        &self,
        container: &ContainerRef,
        state: &ContinuationState,
    ) -> std::result::Result<BlobPage, EnumerationCause>;
}

pub trait ConfigProvider: Send + Sync {
    fn storage_accounts(&self) -> &[StorageAccountConfig];
    fn request_timeout(&self) -> Option<Duration>;
}
