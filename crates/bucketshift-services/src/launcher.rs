//! Migration launch.
//!
//! Launching is not idempotent: a repeated request creates a second job, so
//! this module never retries.

use std::sync::Arc;

use bucketshift_api_client::ControlPlane;
use bucketshift_core::models::{BucketMapping, MigrationId, MigrationSettings};
use bucketshift_core::{MigrationError, ProtocolVersion};

use crate::provisioner::ResourceProvisioner;

pub struct MigrationLauncher {
    api: Arc<dyn ControlPlane>,
    provisioner: ResourceProvisioner,
}

impl MigrationLauncher {
    /// `provisioner` registers buckets on the legacy API, where a migration
    /// references storages rather than account/bucket pairs.
    pub fn new(api: Arc<dyn ControlPlane>, provisioner: ResourceProvisioner) -> Self {
        Self { api, provisioner }
    }

    pub async fn launch_migration(
        &self,
        mappings: &[BucketMapping],
        settings: &MigrationSettings,
    ) -> Result<MigrationId, MigrationError> {
        validate_mappings(mappings)?;

        let result = match self.api.protocol() {
            ProtocolVersion::Current => self
                .api
                .create_migration(mappings, settings)
                .await
                .map_err(MigrationError::from),
            ProtocolVersion::Legacy => self.launch_legacy(mappings, settings).await,
        };

        match &result {
            Ok(id) => tracing::info!(
                migration_id = %id,
                mappings = mappings.len(),
                mode = %settings.mode,
                conflict_resolution = %settings.conflict_resolution,
                "Migration launched"
            ),
            Err(e) => tracing::error!(
                error = %e,
                error_code = e.error_code(),
                mappings = mappings.len(),
                "Failed to launch migration"
            ),
        }
        result
    }

    async fn launch_legacy(
        &self,
        mappings: &[BucketMapping],
        settings: &MigrationSettings,
    ) -> Result<MigrationId, MigrationError> {
        let [mapping] = mappings else {
            return Err(MigrationError::InvalidInput(format!(
                "legacy API accepts exactly one bucket mapping per migration, got {}",
                mappings.len()
            )));
        };

        let source = self
            .provisioner
            .register_bucket(mapping.source_account, &mapping.source_bucket)
            .await?;
        let destination = self
            .provisioner
            .register_bucket(mapping.destination_account, &mapping.destination_bucket)
            .await?;

        Ok(self
            .api
            .create_legacy_migration(source, destination, settings)
            .await?)
    }
}

fn validate_mappings(mappings: &[BucketMapping]) -> Result<(), MigrationError> {
    if mappings.is_empty() {
        return Err(MigrationError::InvalidInput(
            "at least one bucket mapping is required".to_string(),
        ));
    }
    for (index, mapping) in mappings.iter().enumerate() {
        if mapping.source_bucket.trim().is_empty() || mapping.destination_bucket.trim().is_empty()
        {
            return Err(MigrationError::InvalidInput(format!(
                "bucket mapping {} has an empty bucket name",
                index
            )));
        }
    }
    Ok(())
}
