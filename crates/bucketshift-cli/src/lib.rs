use bucketshift_core::{LogLevel, MigrationError};
use bucketshift_services::{ProgressReport, TerminalOutcome};

/// Process exit status for a finished migration. Anything but a clean success
/// is non-zero; setup and transport errors exit with 1 through `main`.
pub fn exit_status(outcome: &TerminalOutcome) -> u8 {
    match outcome {
        TerminalOutcome::Succeeded => 0,
        TerminalOutcome::SucceededWithFailures { .. } => 2,
        TerminalOutcome::Stopped { .. } => 3,
        TerminalOutcome::Failed { .. } => 4,
    }
}

/// One progress line, e.g. `migration 11 poll 3: 500 bytes processed`.
pub fn format_progress(report: &ProgressReport) -> String {
    format!(
        "migration {} poll {}: {}",
        report.migration_id,
        report.poll,
        report.description()
    )
}

/// Log a failed operation at the level its error kind calls for.
pub fn log_migration_error(err: &MigrationError) {
    let status = err.api_error().and_then(|e| e.status());
    match err.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %err, error_code = err.error_code(), "Operation stopped")
        }
        LogLevel::Warn => tracing::warn!(
            error = %err,
            error_code = err.error_code(),
            status = status,
            recoverable = err.is_recoverable(),
            "Operation failed"
        ),
        LogLevel::Error => tracing::error!(
            error = %err,
            error_code = err.error_code(),
            status = status,
            recoverable = err.is_recoverable(),
            "Operation failed"
        ),
    }
}

/// Initialize tracing for the CLI. Logs go to stderr so stdout stays JSON.
pub fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
