//! bucketshift Services Layer
//!
//! Orchestration on top of the control-plane client: idempotent storage
//! account provisioning, migration launch, status polling against the active
//! state vocabulary, and the end-to-end workflow that chains them. Every
//! service talks to the remote side through [`ControlPlane`], so tests can
//! drive them with a scripted implementation.

pub mod classifier;
pub mod launcher;
pub mod poller;
pub mod provisioner;
pub mod retry;
pub mod workflow;

pub use bucketshift_api_client::ControlPlane;
pub use classifier::{classify, ErrorClass};
pub use launcher::MigrationLauncher;
pub use poller::{PollOptions, PollSummary, ProgressReport, StatusPoller, TerminalOutcome};
pub use provisioner::{ProvisionOutcome, ResourceProvisioner};
pub use retry::RetryPolicy;
pub use workflow::{MigrationPlan, MigrationWorkflow, WorkflowReport};
