//! bucketshift Core Library
//!
//! This crate provides the domain models, status vocabularies, error types and
//! configuration shared by the API client, the services and the CLI.

pub mod config;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{Config, Credentials};
pub use error::{ApiError, LogLevel, MigrationError, RemoteErrorBody};
pub use models::{ProtocolVersion, StateClass};
