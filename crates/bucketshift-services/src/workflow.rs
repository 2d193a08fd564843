//! End-to-end migration: provision both sides, launch, watch to completion.

use std::sync::Arc;

use bucketshift_api_client::ControlPlane;
use bucketshift_core::models::{BucketMapping, MigrationId, MigrationSettings, StorageAccountSpec};
use bucketshift_core::MigrationError;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::launcher::MigrationLauncher;
use crate::poller::{PollOptions, PollSummary, ProgressReport, StatusPoller};
use crate::provisioner::{ProvisionOutcome, ResourceProvisioner};
use crate::retry::RetryPolicy;

/// Everything needed to move one bucket to another.
#[derive(Debug, Clone)]
pub struct MigrationPlan {
    pub source: StorageAccountSpec,
    pub source_bucket: String,
    pub destination: StorageAccountSpec,
    pub destination_bucket: String,
    pub settings: MigrationSettings,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowReport {
    pub source_account: ProvisionOutcome,
    pub destination_account: ProvisionOutcome,
    pub migration_id: MigrationId,
    pub summary: PollSummary,
}

pub struct MigrationWorkflow {
    provisioner: ResourceProvisioner,
    launcher: MigrationLauncher,
    poller: StatusPoller,
    options: PollOptions,
}

impl MigrationWorkflow {
    pub fn new(api: Arc<dyn ControlPlane>, retry: RetryPolicy, options: PollOptions) -> Self {
        let provisioner = ResourceProvisioner::new(api.clone(), retry);
        Self {
            launcher: MigrationLauncher::new(api.clone(), provisioner.clone()),
            poller: StatusPoller::new(api, retry),
            provisioner,
            options,
        }
    }

    /// Runs each step in order; the first error ends the run.
    pub async fn run<F>(
        &self,
        plan: &MigrationPlan,
        on_progress: F,
        cancel: &CancellationToken,
    ) -> Result<WorkflowReport, MigrationError>
    where
        F: FnMut(&ProgressReport),
    {
        let source_account = self.provisioner.ensure_storage_account(&plan.source).await?;
        let destination_account = self
            .provisioner
            .ensure_storage_account(&plan.destination)
            .await?;

        let mapping = BucketMapping {
            source_account: source_account.id(),
            source_bucket: plan.source_bucket.clone(),
            destination_account: destination_account.id(),
            destination_bucket: plan.destination_bucket.clone(),
        };
        let migration_id = self
            .launcher
            .launch_migration(std::slice::from_ref(&mapping), &plan.settings)
            .await?;

        let summary = self
            .poller
            .poll_until_terminal(migration_id, self.options, on_progress, cancel)
            .await?;

        Ok(WorkflowReport {
            source_account,
            destination_account,
            migration_id,
            summary,
        })
    }
}
