//! bucketshift CLI: drive bucket-to-bucket migrations through the control plane.
//!
//! Set BUCKETSHIFT_API_URL plus either BUCKETSHIFT_API_KEY or
//! BUCKETSHIFT_USERNAME and BUCKETSHIFT_PASSWORD. A `.env` file is honoured.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use bucketshift_api_client::{ApiClient, Auth};
use bucketshift_cli::{exit_status, format_progress, init_tracing, log_migration_error};
use bucketshift_core::models::{
    find_provider_by_endpoint, BucketMapping, ConflictResolution, MigrationId, MigrationMode,
    MigrationSettings, ProviderId, StorageAccountId, StorageAccountSpec, DEFAULT_SLOTS_PER_MAPPING,
};
use bucketshift_core::{Config, Credentials, MigrationError, ProtocolVersion};
use bucketshift_services::{
    ControlPlane, MigrationLauncher, MigrationPlan, MigrationWorkflow, PollOptions, PollSummary,
    ProgressReport, ResourceProvisioner, RetryPolicy, StatusPoller,
};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "bucketshift", about = "Cloud-to-cloud bucket migration driver")]
struct Cli {
    /// Control-plane API generation: legacy or current
    #[arg(long, global = true, env = "BUCKETSHIFT_API_VERSION")]
    api_version: Option<ProtocolVersion>,

    /// Emit logs as JSON
    #[arg(long, global = true, env = "BUCKETSHIFT_LOG_JSON")]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Provision both storage accounts, launch the migration and watch it finish
    Run {
        /// Source provider: s3, azure or a numeric id
        #[arg(long, default_value = "s3", env = "BUCKETSHIFT_SOURCE_PROVIDER")]
        source_provider: ProviderId,
        /// Source access key id or account name
        #[arg(long, env = "BUCKETSHIFT_SOURCE_IDENTITY")]
        source_identity: String,
        /// Source secret key
        #[arg(long, env = "BUCKETSHIFT_SOURCE_CREDENTIAL", hide_env_values = true)]
        source_credential: String,
        #[arg(long)]
        source_bucket: String,
        /// Destination provider: s3, azure or a numeric id
        #[arg(long, default_value = "s3", env = "BUCKETSHIFT_DESTINATION_PROVIDER")]
        destination_provider: ProviderId,
        /// Destination access key id or account name
        #[arg(long, env = "BUCKETSHIFT_DESTINATION_IDENTITY")]
        destination_identity: String,
        /// Destination secret key
        #[arg(
            long,
            env = "BUCKETSHIFT_DESTINATION_CREDENTIAL",
            hide_env_values = true
        )]
        destination_credential: String,
        #[arg(long)]
        destination_bucket: String,
        #[command(flatten)]
        settings: SettingsArgs,
    },
    /// Ensure a storage account exists and print its id
    Provision {
        /// Provider: s3, azure or a numeric id
        #[arg(long, default_value = "s3")]
        provider: ProviderId,
        /// Access key id or account name
        #[arg(long)]
        identity: String,
        /// Secret key
        #[arg(long, env = "BUCKETSHIFT_ACCOUNT_CREDENTIAL", hide_env_values = true)]
        credential: String,
        /// Connect to the storage endpoint without TLS
        #[arg(long)]
        no_tls: bool,
    },
    /// Launch a migration between already provisioned accounts
    Launch {
        #[arg(long)]
        source_account: i64,
        #[arg(long)]
        source_bucket: String,
        #[arg(long)]
        destination_account: i64,
        #[arg(long)]
        destination_bucket: String,
        #[command(flatten)]
        settings: SettingsArgs,
        /// Keep polling until the migration finishes
        #[arg(long)]
        watch: bool,
    },
    /// Poll a migration until it reaches a terminal state
    Watch {
        /// Migration id
        id: MigrationId,
    },
    /// Fetch the current status of a migration once
    Status {
        /// Migration id
        id: MigrationId,
    },
    /// List storage providers known to the control plane
    Providers {
        /// Only show the provider with this endpoint
        #[arg(long)]
        endpoint: Option<String>,
    },
    /// Exchange BUCKETSHIFT_USERNAME/BUCKETSHIFT_PASSWORD for an access token
    Login,
}

#[derive(Args)]
struct SettingsArgs {
    /// COPY or MOVE
    #[arg(long, default_value = "copy")]
    mode: MigrationMode,
    /// NEWER, ALWAYS or NEVER
    #[arg(long, default_value = "newer")]
    conflict_resolution: ConflictResolution,
    /// Display name for the migration
    #[arg(long)]
    name: Option<String>,
    #[arg(long, default_value_t = DEFAULT_SLOTS_PER_MAPPING)]
    slots_per_mapping: u32,
    /// Legacy API: count source objects before copying
    #[arg(long)]
    count_source_objects: bool,
}

impl SettingsArgs {
    fn into_settings(self) -> MigrationSettings {
        MigrationSettings {
            mode: self.mode,
            conflict_resolution: self.conflict_resolution,
            name: self.name,
            slots_per_mapping: self.slots_per_mapping,
            count_source_objects: self.count_source_objects,
        }
    }
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

fn print_progress(report: &ProgressReport) {
    eprintln!("{}", format_progress(report));
}

/// Log the failure, then hand it to `main` for a non-zero exit.
fn fail(err: MigrationError) -> anyhow::Error {
    log_migration_error(&err);
    err.into()
}

fn finish(summary: &PollSummary) -> anyhow::Result<ExitCode> {
    print_json(summary)?;
    Ok(ExitCode::from(exit_status(&summary.outcome)))
}

/// Cancel polling on Ctrl-C.
fn cancel_on_interrupt() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling");
            token.cancel();
        }
    });
    cancel
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let mut config = Config::from_env().context(
        "Invalid configuration. Set BUCKETSHIFT_API_URL and BUCKETSHIFT_API_KEY \
         (or BUCKETSHIFT_USERNAME and BUCKETSHIFT_PASSWORD)",
    )?;
    if let Some(protocol) = cli.api_version {
        config.protocol = protocol;
    }
    tracing::debug!(config = ?config, "Configuration loaded");

    execute(cli.command, &config).await
}

async fn connect(config: &Config) -> anyhow::Result<Arc<dyn ControlPlane>> {
    let client = ApiClient::connect(config)
        .await
        .context("Failed to create API client")?;
    Ok(Arc::new(client))
}

async fn login(config: &Config) -> anyhow::Result<ExitCode> {
    // Read the pair directly: from_env prefers BUCKETSHIFT_API_KEY when both are set.
    let credentials = match &config.credentials {
        Credentials::Login { .. } => config.credentials.clone(),
        Credentials::ApiKey(_) => {
            Credentials::login_from_env().context("login needs a username and password")?
        }
    };
    let Credentials::Login { username, password } = &credentials else {
        anyhow::bail!("login requires BUCKETSHIFT_USERNAME and BUCKETSHIFT_PASSWORD");
    };
    let client = ApiClient::new(
        config.api_url.clone(),
        Auth::Anonymous,
        config.protocol,
        config.http_timeout,
    )?;
    let token = client
        .authenticate(username, password)
        .await
        .context("Login failed")?;
    print_json(&serde_json::json!({ "token": token }))?;
    Ok(ExitCode::SUCCESS)
}

async fn execute(command: Commands, config: &Config) -> anyhow::Result<ExitCode> {
    let retry = RetryPolicy::from_config(config);
    let poll_options = PollOptions::from_config(config);

    match command {
        Commands::Run {
            source_provider,
            source_identity,
            source_credential,
            source_bucket,
            destination_provider,
            destination_identity,
            destination_credential,
            destination_bucket,
            settings,
        } => {
            let plan = MigrationPlan {
                source: StorageAccountSpec::new(source_provider, source_identity, source_credential),
                source_bucket,
                destination: StorageAccountSpec::new(
                    destination_provider,
                    destination_identity,
                    destination_credential,
                ),
                destination_bucket,
                settings: settings.into_settings(),
            };
            let api = connect(config).await?;
            let cancel = cancel_on_interrupt();
            let report = MigrationWorkflow::new(api, retry, poll_options)
                .run(&plan, print_progress, &cancel)
                .await
                .map_err(fail)?;
            print_json(&report)?;
            Ok(ExitCode::from(exit_status(&report.summary.outcome)))
        }
        Commands::Provision {
            provider,
            identity,
            credential,
            no_tls,
        } => {
            let spec = StorageAccountSpec::new(provider, identity, credential).with_tls(!no_tls);
            let api = connect(config).await?;
            let outcome = ResourceProvisioner::new(api, retry)
                .ensure_storage_account(&spec)
                .await
                .map_err(fail)?;
            print_json(&outcome)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Launch {
            source_account,
            source_bucket,
            destination_account,
            destination_bucket,
            settings,
            watch,
        } => {
            let mapping = BucketMapping {
                source_account: StorageAccountId(source_account),
                source_bucket,
                destination_account: StorageAccountId(destination_account),
                destination_bucket,
            };
            let api = connect(config).await?;
            let provisioner = ResourceProvisioner::new(api.clone(), retry);
            let id = MigrationLauncher::new(api.clone(), provisioner)
                .launch_migration(&[mapping], &settings.into_settings())
                .await
                .map_err(fail)?;
            print_json(&serde_json::json!({ "migration_id": id }))?;
            if !watch {
                return Ok(ExitCode::SUCCESS);
            }
            let cancel = cancel_on_interrupt();
            let summary = StatusPoller::new(api, retry)
                .poll_until_terminal(id, poll_options, print_progress, &cancel)
                .await
                .map_err(fail)?;
            finish(&summary)
        }
        Commands::Watch { id } => {
            let api = connect(config).await?;
            let cancel = cancel_on_interrupt();
            let summary = StatusPoller::new(api, retry)
                .poll_until_terminal(id, poll_options, print_progress, &cancel)
                .await
                .map_err(fail)?;
            finish(&summary)
        }
        Commands::Status { id } => {
            let poller = StatusPoller::new(connect(config).await?, retry);
            let (status, class) = poller.check_once(id).await.map_err(fail)?;
            print_json(&serde_json::json!({
                "migration_id": id,
                "state": status.state,
                "terminal": class.is_terminal(),
                "detail": poller.protocol().describe(&status),
                "bytes_processed": status.bytes_processed,
                "objects_failed": status.objects_failed,
            }))?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Providers { endpoint } => {
            let providers = connect(config)
                .await?
                .list_providers()
                .await
                .map_err(|e| fail(e.into()))?;
            match endpoint {
                Some(endpoint) => {
                    let provider = find_provider_by_endpoint(&providers, &endpoint)
                        .with_context(|| format!("No provider with endpoint {}", endpoint))?;
                    print_json(provider)?;
                }
                None => print_json(&providers)?,
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Login => login(config).await,
    }
}
