//! Control plane abstraction trait
//!
//! The provisioning, launch and polling services depend on this trait rather
//! than on [`ApiClient`] directly, so they can be driven by a scripted
//! implementation in tests.

use async_trait::async_trait;
use bucketshift_core::models::{
    BucketMapping, Migration, MigrationId, MigrationSettings, StorageAccountId,
    StorageAccountSpec, StorageId, StorageProvider,
};
use bucketshift_core::{ApiError, ProtocolVersion};

use crate::ApiClient;

#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// API generation this control plane speaks. Selects the state vocabulary.
    fn protocol(&self) -> ProtocolVersion;

    async fn create_storage_account(
        &self,
        spec: &StorageAccountSpec,
    ) -> Result<StorageAccountId, ApiError>;

    /// Legacy only: register buckets under an account.
    async fn add_storages(
        &self,
        account: StorageAccountId,
        buckets: &[&str],
    ) -> Result<Vec<StorageId>, ApiError>;

    /// Current only: create a migration from bucket mappings.
    async fn create_migration(
        &self,
        mappings: &[BucketMapping],
        settings: &MigrationSettings,
    ) -> Result<MigrationId, ApiError>;

    /// Legacy only: create a migration between two registered storages.
    async fn create_legacy_migration(
        &self,
        source: StorageId,
        destination: StorageId,
        settings: &MigrationSettings,
    ) -> Result<MigrationId, ApiError>;

    async fn get_migration(&self, id: MigrationId) -> Result<Migration, ApiError>;

    async fn list_providers(&self) -> Result<Vec<StorageProvider>, ApiError>;
}

#[async_trait]
impl ControlPlane for ApiClient {
    fn protocol(&self) -> ProtocolVersion {
        ApiClient::protocol(self)
    }

    async fn create_storage_account(
        &self,
        spec: &StorageAccountSpec,
    ) -> Result<StorageAccountId, ApiError> {
        self.add_storage_account(spec).await
    }

    async fn add_storages(
        &self,
        account: StorageAccountId,
        buckets: &[&str],
    ) -> Result<Vec<StorageId>, ApiError> {
        ApiClient::add_storages(self, account, buckets).await
    }

    async fn create_migration(
        &self,
        mappings: &[BucketMapping],
        settings: &MigrationSettings,
    ) -> Result<MigrationId, ApiError> {
        self.add_migration(mappings, settings).await
    }

    async fn create_legacy_migration(
        &self,
        source: StorageId,
        destination: StorageId,
        settings: &MigrationSettings,
    ) -> Result<MigrationId, ApiError> {
        self.add_legacy_migration(source, destination, settings)
            .await
    }

    async fn get_migration(&self, id: MigrationId) -> Result<Migration, ApiError> {
        ApiClient::get_migration(self, id).await
    }

    async fn list_providers(&self) -> Result<Vec<StorageProvider>, ApiError> {
        self.list_storage_providers().await
    }
}
