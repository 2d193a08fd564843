//! Status polling until a migration reaches a terminal state.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bucketshift_api_client::ControlPlane;
use bucketshift_core::models::{MigrationId, MigrationStatus};
use bucketshift_core::{Config, MigrationError, ProtocolVersion, StateClass};
use serde::Serialize;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::retry::RetryPolicy;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    pub interval: Duration,
    /// Give up once this much time has passed since the first fetch. The
    /// last sleep is shortened so the deadline is not overrun.
    pub deadline: Option<Duration>,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            deadline: None,
        }
    }
}

impl PollOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            interval: config.poll_interval,
            deadline: config.poll_deadline,
        }
    }
}

/// One observation handed to the progress callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressReport {
    pub migration_id: MigrationId,
    /// 1-based fetch counter.
    pub poll: u32,
    pub state: String,
    pub detail: Option<String>,
}

impl ProgressReport {
    /// Human-readable line: the detail if the state has one, else the raw state.
    pub fn description(&self) -> &str {
        self.detail.as_deref().unwrap_or(&self.state)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TerminalOutcome {
    Succeeded,
    SucceededWithFailures { objects_failed: u64 },
    Stopped { state: String },
    Failed { state: String },
}

impl TerminalOutcome {
    /// Only a clean success counts. Partial success still needs attention.
    pub fn is_success(&self) -> bool {
        matches!(self, TerminalOutcome::Succeeded)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollSummary {
    pub outcome: TerminalOutcome,
    pub polls: u32,
    pub last_status: MigrationStatus,
}

pub struct StatusPoller {
    api: Arc<dyn ControlPlane>,
    retry: RetryPolicy,
}

impl StatusPoller {
    pub fn new(api: Arc<dyn ControlPlane>, retry: RetryPolicy) -> Self {
        Self { api, retry }
    }

    pub fn protocol(&self) -> ProtocolVersion {
        self.api.protocol()
    }

    /// Fetch the migration once and classify its state.
    pub async fn check_once(
        &self,
        migration_id: MigrationId,
    ) -> Result<(MigrationStatus, StateClass), MigrationError> {
        let migration = self
            .retry
            .run("get_migration", || self.api.get_migration(migration_id))
            .await?;
        let class = self.protocol().classify(&migration.stat.state);
        Ok((migration.stat, class))
    }

    /// Poll until the migration reaches a terminal state.
    ///
    /// `on_progress` runs once per fetch, terminal fetches included. An
    /// unrecognized state is reported and then returned as
    /// [`MigrationError::UnrecognizedState`] without another fetch.
    pub async fn poll_until_terminal<F>(
        &self,
        migration_id: MigrationId,
        options: PollOptions,
        mut on_progress: F,
        cancel: &CancellationToken,
    ) -> Result<PollSummary, MigrationError>
    where
        F: FnMut(&ProgressReport),
    {
        let protocol = self.protocol();
        let started = Instant::now();
        let mut polls: u32 = 0;

        loop {
            if polls > 0 {
                if let Some(deadline) = options.deadline {
                    if started.elapsed() >= deadline {
                        tracing::warn!(
                            migration_id = %migration_id,
                            polls = polls,
                            deadline_secs = deadline.as_secs_f64(),
                            "Migration did not finish before the polling deadline"
                        );
                        return Err(MigrationError::DeadlineExceeded {
                            migration_id,
                            deadline,
                        });
                    }
                }
            }

            let (status, class) = self.check_once(migration_id).await?;
            polls += 1;

            let report = ProgressReport {
                migration_id,
                poll: polls,
                state: status.state.clone(),
                detail: protocol.describe(&status),
            };
            on_progress(&report);
            tracing::info!(
                migration_id = %migration_id,
                poll = polls,
                state = %status.state,
                detail = report.description(),
                "Migration status"
            );

            let outcome = match class {
                StateClass::NonTerminal => None,
                StateClass::TerminalSuccess => Some(match protocol.failed_objects(&status) {
                    Some(objects_failed) => {
                        TerminalOutcome::SucceededWithFailures { objects_failed }
                    }
                    None => TerminalOutcome::Succeeded,
                }),
                StateClass::TerminalStopped => Some(TerminalOutcome::Stopped {
                    state: status.state.clone(),
                }),
                StateClass::TerminalFailure => Some(TerminalOutcome::Failed {
                    state: status.state.clone(),
                }),
                StateClass::TerminalUnknown => {
                    tracing::warn!(
                        migration_id = %migration_id,
                        state = %status.state,
                        protocol = %protocol,
                        "Unrecognized migration state, stopping"
                    );
                    return Err(MigrationError::UnrecognizedState {
                        migration_id,
                        state: status.state,
                    });
                }
            };

            if let Some(outcome) = outcome {
                tracing::info!(
                    migration_id = %migration_id,
                    polls = polls,
                    outcome = ?outcome,
                    "Migration reached terminal state"
                );
                return Ok(PollSummary {
                    outcome,
                    polls,
                    last_status: status,
                });
            }

            // Never sleep past the deadline.
            let pause = match options.deadline {
                Some(deadline) => options
                    .interval
                    .min(deadline.saturating_sub(started.elapsed())),
                None => options.interval,
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!(
                        migration_id = %migration_id,
                        polls = polls,
                        "Polling cancelled"
                    );
                    return Err(MigrationError::Cancelled { migration_id });
                }
                _ = sleep(pause) => {}
            }
        }
    }
}
