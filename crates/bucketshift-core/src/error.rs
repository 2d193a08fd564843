//! Error types module
//!
//! [`ApiError`] is what the control-plane client produces: a transport failure,
//! an undecodable response, or a non-success HTTP status together with the raw
//! response body. [`MigrationError`] is what the provisioning, launch and
//! polling operations return to their callers.

use std::time::Duration;

use serde::Deserialize;

use crate::models::{MigrationId, StorageAccountId};

/// HTTP status the control plane uses for semantic-validation rejections.
pub const UNPROCESSABLE_ENTITY: u16 = 422;

/// Machine-readable message sent when a storage account is already registered.
pub const STORAGE_ACCOUNT_ALREADY_EXISTS: &str = "STORAGE_ACCOUNT_ALREADY_EXISTS";

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected conditions such as a cancelled watch
    Debug,
    /// Warning level - for rejections the operator can fix
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Failure of a single control-plane call.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    #[error("Control plane returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Failed to decode control plane response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn body(&self) -> Option<&str> {
        match self {
            ApiError::Status { body, .. } => Some(body.as_str()),
            _ => None,
        }
    }

    /// Parse the structured error body carried by a 422 response.
    ///
    /// Returns `None` for any other status or for a body that is not the
    /// control plane's error JSON.
    pub fn remote_error(&self) -> Option<RemoteErrorBody> {
        match self {
            ApiError::Status { status, body } if *status == UNPROCESSABLE_ENTITY => {
                serde_json::from_str(body).ok()
            }
            _ => None,
        }
    }

    /// Network failures and server-side errors. Only these are worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Transport(_) => true,
            ApiError::Status { status, .. } => *status >= 500,
            ApiError::Decode(_) => false,
        }
    }
}

/// Structured error body sent with semantic-validation failures.
///
/// Newer servers put the conflicting resource id in `id`; older ones put it
/// in the first element of `args`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct RemoteErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub args: Vec<serde_json::Value>,
}

impl RemoteErrorBody {
    /// Resource id referenced by the error, from `id` or else `args[0]`.
    pub fn resource_id(&self) -> Option<i64> {
        self.id
            .as_ref()
            .and_then(json_to_id)
            .or_else(|| self.args.first().and_then(json_to_id))
    }
}

fn json_to_id(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("Control plane rejected the request: {message}")]
    Validation {
        message: String,
        #[source]
        source: ApiError,
    },

    #[error(transparent)]
    Transport(ApiError),

    #[error("Migration {migration_id} reported unrecognized state '{state}'")]
    UnrecognizedState {
        migration_id: MigrationId,
        state: String,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Watching migration {migration_id} was cancelled")]
    Cancelled { migration_id: MigrationId },

    #[error("Migration {migration_id} did not finish within {deadline:?}")]
    DeadlineExceeded {
        migration_id: MigrationId,
        deadline: Duration,
    },

    #[error("Control plane returned no storage id for bucket '{bucket}' on account {account}")]
    MissingStorageId {
        account: StorageAccountId,
        bucket: String,
    },
}

impl From<ApiError> for MigrationError {
    fn from(err: ApiError) -> Self {
        if err.status() == Some(UNPROCESSABLE_ENTITY) {
            let message = err
                .remote_error()
                .and_then(|body| body.message)
                .or_else(|| err.body().map(str::to_string))
                .unwrap_or_default();
            return MigrationError::Validation {
                message,
                source: err,
            };
        }
        MigrationError::Transport(err)
    }
}

/// Static metadata for each variant: (error_code, recoverable, log_level).
fn migration_error_static_metadata(err: &MigrationError) -> (&'static str, bool, LogLevel) {
    match err {
        MigrationError::Validation { .. } => ("VALIDATION_ERROR", false, LogLevel::Warn),
        MigrationError::Transport(source) => {
            ("TRANSPORT_ERROR", source.is_transient(), LogLevel::Error)
        }
        MigrationError::UnrecognizedState { .. } => {
            ("UNRECOGNIZED_STATE", false, LogLevel::Error)
        }
        MigrationError::InvalidInput(_) => ("INVALID_INPUT", false, LogLevel::Warn),
        MigrationError::Cancelled { .. } => ("CANCELLED", true, LogLevel::Debug),
        MigrationError::DeadlineExceeded { .. } => ("DEADLINE_EXCEEDED", true, LogLevel::Warn),
        MigrationError::MissingStorageId { .. } => ("MISSING_STORAGE_ID", false, LogLevel::Error),
    }
}

impl MigrationError {
    /// Machine-readable error code (e.g. "TRANSPORT_ERROR")
    pub fn error_code(&self) -> &'static str {
        migration_error_static_metadata(self).0
    }

    /// Whether running the same operation again may succeed
    pub fn is_recoverable(&self) -> bool {
        migration_error_static_metadata(self).1
    }

    pub fn log_level(&self) -> LogLevel {
        migration_error_static_metadata(self).2
    }

    /// Underlying control-plane error, if any.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            MigrationError::Validation { source, .. } => Some(source),
            MigrationError::Transport(source) => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(status: u16, body: &str) -> ApiError {
        ApiError::Status {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn remote_error_only_parsed_for_422() {
        let body = r#"{"message":"STORAGE_ACCOUNT_ALREADY_EXISTS","id":42}"#;
        assert!(status(422, body).remote_error().is_some());
        assert!(status(409, body).remote_error().is_none());
        assert!(status(422, "<html>oops</html>").remote_error().is_none());
    }

    #[test]
    fn resource_id_prefers_id_then_args() {
        let with_id: RemoteErrorBody =
            serde_json::from_str(r#"{"message":"X","id":42,"args":[7]}"#).unwrap();
        assert_eq!(with_id.resource_id(), Some(42));

        let with_args: RemoteErrorBody =
            serde_json::from_str(r#"{"message":"X","args":["19"]}"#).unwrap();
        assert_eq!(with_args.resource_id(), Some(19));

        let without: RemoteErrorBody = serde_json::from_str(r#"{"message":"X"}"#).unwrap();
        assert_eq!(without.resource_id(), None);

        let junk: RemoteErrorBody =
            serde_json::from_str(r#"{"message":"X","id":"abc","args":[true]}"#).unwrap();
        assert_eq!(junk.resource_id(), None);
    }

    #[test]
    fn unprocessable_becomes_validation_with_remote_message() {
        let err = MigrationError::from(status(422, r#"{"message":"INVALID_CREDENTIALS"}"#));
        match &err {
            MigrationError::Validation { message, source } => {
                assert_eq!(message, "INVALID_CREDENTIALS");
                assert_eq!(source.status(), Some(422));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        assert!(!err.is_recoverable());
        assert_eq!(err.log_level(), LogLevel::Warn);
    }

    #[test]
    fn unprocessable_non_json_keeps_raw_body_as_message() {
        let err = MigrationError::from(status(422, "bucket name too long"));
        assert!(err.to_string().contains("bucket name too long"));
    }

    #[test]
    fn other_statuses_become_transport_errors() {
        let unauthorized = MigrationError::from(status(401, "bad token"));
        assert_eq!(unauthorized.error_code(), "TRANSPORT_ERROR");
        assert!(!unauthorized.is_recoverable());
        assert_eq!(unauthorized.api_error().and_then(ApiError::status), Some(401));

        let unavailable = MigrationError::from(status(503, "try later"));
        assert!(unavailable.is_recoverable());

        let network = MigrationError::from(ApiError::Transport("connection reset".into()));
        assert!(network.is_recoverable());
        assert_eq!(network.log_level(), LogLevel::Error);
    }

    #[test]
    fn transient_classification() {
        assert!(ApiError::Transport("timeout".into()).is_transient());
        assert!(status(502, "").is_transient());
        assert!(!status(422, "").is_transient());
        assert!(!status(404, "").is_transient());
        assert!(!ApiError::Decode("eof".into()).is_transient());
    }
}
