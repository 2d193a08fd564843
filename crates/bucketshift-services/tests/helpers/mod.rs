//! Test helpers: a scripted in-memory control plane.
//!
//! Run from workspace root: `cargo test -p bucketshift-services`.
//! Responses are queued per operation and consumed in order. Once the status
//! queue is drained the last status is repeated, which models a migration
//! that stays in one state.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bucketshift_core::models::{
    BucketMapping, Migration, MigrationId, MigrationSettings, MigrationStatus, ProviderId,
    StorageAccountId, StorageAccountSpec, StorageId, StorageProvider,
};
use bucketshift_core::{ApiError, ProtocolVersion};
use bucketshift_services::{ControlPlane, PollOptions};

pub struct ScriptedControlPlane {
    protocol: ProtocolVersion,
    accounts: Mutex<VecDeque<Result<StorageAccountId, ApiError>>>,
    storages: Mutex<VecDeque<Result<Vec<StorageId>, ApiError>>>,
    launches: Mutex<VecDeque<Result<MigrationId, ApiError>>>,
    statuses: Mutex<VecDeque<Result<MigrationStatus, ApiError>>>,
    last_status: Mutex<Option<MigrationStatus>>,
    calls: Mutex<Vec<&'static str>>,
    launched_mappings: Mutex<Vec<Vec<BucketMapping>>>,
    legacy_launches: Mutex<Vec<(StorageId, StorageId)>>,
    registered_buckets: Mutex<Vec<(StorageAccountId, String)>>,
}

impl ScriptedControlPlane {
    pub fn new(protocol: ProtocolVersion) -> Self {
        Self {
            protocol,
            accounts: Mutex::new(VecDeque::new()),
            storages: Mutex::new(VecDeque::new()),
            launches: Mutex::new(VecDeque::new()),
            statuses: Mutex::new(VecDeque::new()),
            last_status: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            launched_mappings: Mutex::new(Vec::new()),
            legacy_launches: Mutex::new(Vec::new()),
            registered_buckets: Mutex::new(Vec::new()),
        }
    }

    pub fn current() -> Self {
        Self::new(ProtocolVersion::Current)
    }

    pub fn legacy() -> Self {
        Self::new(ProtocolVersion::Legacy)
    }

    pub fn with_account(self, result: Result<StorageAccountId, ApiError>) -> Self {
        self.accounts.lock().unwrap().push_back(result);
        self
    }

    pub fn with_storages(self, result: Result<Vec<StorageId>, ApiError>) -> Self {
        self.storages.lock().unwrap().push_back(result);
        self
    }

    pub fn with_launch(self, result: Result<MigrationId, ApiError>) -> Self {
        self.launches.lock().unwrap().push_back(result);
        self
    }

    pub fn with_status(self, status: MigrationStatus) -> Self {
        self.statuses.lock().unwrap().push_back(Ok(status));
        self
    }

    pub fn with_states(self, states: &[&str]) -> Self {
        states
            .iter()
            .fold(self, |plane, state| plane.with_status(MigrationStatus::new(*state)))
    }

    pub fn with_status_error(self, err: ApiError) -> Self {
        self.statuses.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Number of times `operation` was called.
    pub fn count(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|name| **name == operation)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn launched_mappings(&self) -> Vec<Vec<BucketMapping>> {
        self.launched_mappings.lock().unwrap().clone()
    }

    pub fn legacy_launches(&self) -> Vec<(StorageId, StorageId)> {
        self.legacy_launches.lock().unwrap().clone()
    }

    pub fn registered_buckets(&self) -> Vec<(StorageAccountId, String)> {
        self.registered_buckets.lock().unwrap().clone()
    }

    fn record(&self, operation: &'static str) {
        self.calls.lock().unwrap().push(operation);
    }
}

fn unscripted(operation: &str) -> ApiError {
    ApiError::Status {
        status: 500,
        body: format!("no scripted response for {}", operation),
    }
}

fn pop<T>(queue: &Mutex<VecDeque<Result<T, ApiError>>>, operation: &str) -> Result<T, ApiError> {
    queue
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Err(unscripted(operation)))
}

#[async_trait]
impl ControlPlane for ScriptedControlPlane {
    fn protocol(&self) -> ProtocolVersion {
        self.protocol
    }

    async fn create_storage_account(
        &self,
        _spec: &StorageAccountSpec,
    ) -> Result<StorageAccountId, ApiError> {
        self.record("create_storage_account");
        pop(&self.accounts, "create_storage_account")
    }

    async fn add_storages(
        &self,
        account: StorageAccountId,
        buckets: &[&str],
    ) -> Result<Vec<StorageId>, ApiError> {
        self.record("add_storages");
        let mut registered = self.registered_buckets.lock().unwrap();
        registered.extend(buckets.iter().map(|b| (account, b.to_string())));
        drop(registered);
        pop(&self.storages, "add_storages")
    }

    async fn create_migration(
        &self,
        mappings: &[BucketMapping],
        _settings: &MigrationSettings,
    ) -> Result<MigrationId, ApiError> {
        self.record("create_migration");
        self.launched_mappings
            .lock()
            .unwrap()
            .push(mappings.to_vec());
        pop(&self.launches, "create_migration")
    }

    async fn create_legacy_migration(
        &self,
        source: StorageId,
        destination: StorageId,
        _settings: &MigrationSettings,
    ) -> Result<MigrationId, ApiError> {
        self.record("create_legacy_migration");
        self.legacy_launches
            .lock()
            .unwrap()
            .push((source, destination));
        pop(&self.launches, "create_legacy_migration")
    }

    async fn get_migration(&self, id: MigrationId) -> Result<Migration, ApiError> {
        self.record("get_migration");
        let next = self.statuses.lock().unwrap().pop_front();
        let stat = match next {
            Some(Ok(status)) => status,
            Some(Err(err)) => return Err(err),
            None => self
                .last_status
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| unscripted("get_migration"))?,
        };
        *self.last_status.lock().unwrap() = Some(stat.clone());
        Ok(Migration { id, stat })
    }

    async fn list_providers(&self) -> Result<Vec<StorageProvider>, ApiError> {
        self.record("list_providers");
        Ok(vec![StorageProvider {
            id: ProviderId::AMAZON_S3,
            name: Some("Amazon S3".to_string()),
            endpoint: Some("s3.amazonaws.com".to_string()),
        }])
    }
}

/// 422 body the control plane sends for a duplicate storage account.
pub fn already_exists(id: i64) -> ApiError {
    ApiError::Status {
        status: 422,
        body: format!(r#"{{"message":"STORAGE_ACCOUNT_ALREADY_EXISTS","id":{}}}"#, id),
    }
}

pub fn validation(message: &str) -> ApiError {
    ApiError::Status {
        status: 422,
        body: format!(r#"{{"message":"{}"}}"#, message),
    }
}

pub fn server_error(status: u16) -> ApiError {
    ApiError::Status {
        status,
        body: "internal error".to_string(),
    }
}

pub fn s3_account(identity: &str) -> StorageAccountSpec {
    StorageAccountSpec::new(ProviderId::AMAZON_S3, identity, "secret")
}

pub fn azure_account(identity: &str) -> StorageAccountSpec {
    StorageAccountSpec::new(ProviderId::AZURE_BLOB, identity, "secret")
}

pub fn mapping(
    source: i64,
    source_bucket: &str,
    destination: i64,
    destination_bucket: &str,
) -> BucketMapping {
    BucketMapping {
        source_account: StorageAccountId(source),
        source_bucket: source_bucket.to_string(),
        destination_account: StorageAccountId(destination),
        destination_bucket: destination_bucket.to_string(),
    }
}

/// Poll options that keep tests fast.
pub fn fast_poll() -> PollOptions {
    PollOptions {
        interval: Duration::from_millis(1),
        deadline: None,
    }
}
