//! Idempotent storage account provisioning.

use std::sync::Arc;

use bucketshift_api_client::ControlPlane;
use bucketshift_core::models::{StorageAccountId, StorageAccountSpec, StorageId};
use bucketshift_core::MigrationError;
use serde::Serialize;

use crate::classifier::{classify, ErrorClass};
use crate::retry::RetryPolicy;

/// How a storage account id was obtained. Both arms are success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "id", rename_all = "snake_case")]
pub enum ProvisionOutcome {
    Created(StorageAccountId),
    AlreadyExisted(StorageAccountId),
}

impl ProvisionOutcome {
    pub fn id(&self) -> StorageAccountId {
        match self {
            ProvisionOutcome::Created(id) | ProvisionOutcome::AlreadyExisted(id) => *id,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, ProvisionOutcome::Created(_))
    }
}

#[derive(Clone)]
pub struct ResourceProvisioner {
    api: Arc<dyn ControlPlane>,
    retry: RetryPolicy,
}

impl ResourceProvisioner {
    pub fn new(api: Arc<dyn ControlPlane>, retry: RetryPolicy) -> Self {
        Self { api, retry }
    }

    /// Make sure a storage account exists for `spec` and return its id.
    ///
    /// A 422 "already exists" response resolves to the existing account's id.
    /// Every other failure is returned with its status code and body intact.
    pub async fn ensure_storage_account(
        &self,
        spec: &StorageAccountSpec,
    ) -> Result<ProvisionOutcome, MigrationError> {
        let result = self
            .retry
            .run("create_storage_account", || {
                self.api.create_storage_account(spec)
            })
            .await;

        match result {
            Ok(id) => {
                tracing::info!(
                    storage_account_id = %id,
                    provider = %spec.provider,
                    identity = %spec.identity,
                    "Storage account created"
                );
                Ok(ProvisionOutcome::Created(id))
            }
            Err(err) => match classify(&err) {
                ErrorClass::AlreadyExists(id) => {
                    tracing::info!(
                        storage_account_id = %id,
                        provider = %spec.provider,
                        identity = %spec.identity,
                        "Storage account already exists, reusing it"
                    );
                    Ok(ProvisionOutcome::AlreadyExisted(id))
                }
                ErrorClass::Validation { .. } | ErrorClass::Transport => {
                    tracing::error!(
                        provider = %spec.provider,
                        identity = %spec.identity,
                        status = err.status(),
                        error = %err,
                        "Failed to provision storage account"
                    );
                    Err(MigrationError::from(err))
                }
            },
        }
    }

    /// Legacy API: register `bucket` under `account` and return its storage id.
    pub async fn register_bucket(
        &self,
        account: StorageAccountId,
        bucket: &str,
    ) -> Result<StorageId, MigrationError> {
        let buckets = [bucket];
        let ids = self
            .retry
            .run("add_storages", || self.api.add_storages(account, &buckets))
            .await?;

        let id = ids
            .into_iter()
            .next()
            .ok_or_else(|| MigrationError::MissingStorageId {
                account,
                bucket: bucket.to_string(),
            })?;

        tracing::info!(
            storage_account_id = %account,
            storage_id = %id,
            bucket = bucket,
            "Bucket registered"
        );
        Ok(id)
    }
}
