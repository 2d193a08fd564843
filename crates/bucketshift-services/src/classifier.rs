//! Separates the recoverable "already exists" conflict from every other
//! control-plane failure.

use bucketshift_core::error::{STORAGE_ACCOUNT_ALREADY_EXISTS, UNPROCESSABLE_ENTITY};
use bucketshift_core::models::StorageAccountId;
use bucketshift_core::ApiError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorClass {
    /// The storage account is already registered under this id.
    AlreadyExists(StorageAccountId),
    /// Any other semantic-validation rejection. Fatal.
    Validation { message: String },
    /// Network, auth, server-side or decoding failure. Fatal.
    Transport,
}

impl ErrorClass {
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ErrorClass::AlreadyExists(_))
    }
}

pub fn classify(err: &ApiError) -> ErrorClass {
    if err.status() != Some(UNPROCESSABLE_ENTITY) {
        return ErrorClass::Transport;
    }

    let Some(body) = err.remote_error() else {
        return ErrorClass::Validation {
            message: err.body().unwrap_or_default().to_string(),
        };
    };

    let message = body.message.clone().unwrap_or_default();
    if message == STORAGE_ACCOUNT_ALREADY_EXISTS {
        if let Some(id) = body.resource_id() {
            return ErrorClass::AlreadyExists(StorageAccountId(id));
        }
        tracing::warn!(
            body = err.body().unwrap_or_default(),
            "Already-exists response carried no resource id"
        );
    }

    ErrorClass::Validation { message }
}
