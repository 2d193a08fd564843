//! Data models for the application
//!
//! Storage accounts, migrations and the per-generation status vocabularies.

mod migration;
mod status;
mod storage_account;

pub use migration::*;
pub use status::*;
pub use storage_account::*;
