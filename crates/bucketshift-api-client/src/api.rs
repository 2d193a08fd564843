//! Domain methods for the control-plane client.
//!
//! Request bodies differ between the legacy and current API generations; the
//! wire types for each are private to this module. Responses are decoded into
//! the shared `bucketshift_core::models` types.

use crate::ApiClient;
use bucketshift_core::models::{
    BucketMapping, ConflictResolution, Migration, MigrationId, MigrationMode, MigrationSettings,
    ProviderId, StorageAccountId, StorageAccountSpec, StorageId, StorageProvider,
};
use bucketshift_core::{ApiError, ProtocolVersion};
use serde::{Deserialize, Serialize};

const AUTHENTICATION_PATH: &str = "/rest/authentication";
const PROVIDERS_PATH: &str = "/rest/storages/providers";
const MIGRATIONS_PATH: &str = "/rest/migrations";
const STORAGE_ACCOUNTS_PATH: &str = "/rest/storage-accounts";
const LEGACY_STORAGE_ACCOUNTS_PATH: &str = "/rest/storages/accounts";

#[derive(Debug, Deserialize)]
struct IdResponse {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct IdsResponse {
    ids: Vec<i64>,
}

#[derive(Serialize)]
struct AuthenticationRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct AuthenticationResponse {
    token: String,
}

// Current generation

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AddStorageAccountRequest<'a> {
    storage_account: NewStorageAccount<'a>,
    verify_keys: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewStorageAccount<'a> {
    provider_id: ProviderId,
    settings: StorageAccountSettings<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StorageAccountSettings<'a> {
    identity: &'a str,
    credential: &'a str,
    use_ssl: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AddMigrationRequest<'a> {
    settings: MigrationSettingsRequest<'a>,
    mappings: Vec<MappingRequest<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MigrationSettingsRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    migration_mode: MigrationMode,
    conflict_resolution: ConflictResolution,
    slots_per_mapping: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MappingRequest<'a> {
    source_storage_account_id: StorageAccountId,
    source_bucket_name: &'a str,
    dest_storage_account_id: StorageAccountId,
    dest_bucket_name: &'a str,
}

// Legacy generation

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LegacyAddStorageAccountRequest<'a> {
    storage_account: LegacyStorageAccount<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LegacyStorageAccount<'a> {
    provider_id: ProviderId,
    identity: &'a str,
    credential: &'a str,
    use_ssl: bool,
}

#[derive(Serialize)]
struct AddStoragesRequest<'a> {
    buckets: Vec<BucketName<'a>>,
}

#[derive(Serialize)]
struct BucketName<'a> {
    name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LegacyAddMigrationRequest {
    source_id: StorageId,
    destination_id: StorageId,
    count_source_objects: bool,
    slots: u32,
    migration_mode: MigrationMode,
    conflict_resolution: ConflictResolution,
}

impl ApiClient {
    /// Exchange a username and password for an API token.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<String, ApiError> {
        let response: AuthenticationResponse = self
            .post_json(
                AUTHENTICATION_PATH,
                &AuthenticationRequest { username, password },
            )
            .await?;
        Ok(response.token)
    }

    /// List every storage provider the control plane supports.
    pub async fn list_storage_providers(&self) -> Result<Vec<StorageProvider>, ApiError> {
        self.get(PROVIDERS_PATH).await
    }

    /// Register a storage account. Fails with HTTP 422 if it already exists.
    pub async fn add_storage_account(
        &self,
        spec: &StorageAccountSpec,
    ) -> Result<StorageAccountId, ApiError> {
        let response: IdResponse = match self.protocol() {
            ProtocolVersion::Current => {
                let body = AddStorageAccountRequest {
                    storage_account: NewStorageAccount {
                        provider_id: spec.provider,
                        settings: StorageAccountSettings {
                            identity: &spec.identity,
                            credential: &spec.credential,
                            use_ssl: spec.use_tls,
                        },
                    },
                    verify_keys: true,
                };
                self.post_json(STORAGE_ACCOUNTS_PATH, &body).await?
            }
            ProtocolVersion::Legacy => {
                let body = LegacyAddStorageAccountRequest {
                    storage_account: LegacyStorageAccount {
                        provider_id: spec.provider,
                        identity: &spec.identity,
                        credential: &spec.credential,
                        use_ssl: spec.use_tls,
                    },
                };
                self.post_json(LEGACY_STORAGE_ACCOUNTS_PATH, &body).await?
            }
        };
        Ok(StorageAccountId(response.id))
    }

    /// Legacy API: register buckets under a storage account, returning one storage id per bucket.
    pub async fn add_storages(
        &self,
        account: StorageAccountId,
        buckets: &[&str],
    ) -> Result<Vec<StorageId>, ApiError> {
        let body = AddStoragesRequest {
            buckets: buckets.iter().map(|name| BucketName { name: *name }).collect(),
        };
        let response: IdsResponse = self
            .post_json(
                &format!("{}/{}/storages", LEGACY_STORAGE_ACCOUNTS_PATH, account),
                &body,
            )
            .await?;
        Ok(response.ids.into_iter().map(StorageId).collect())
    }

    /// Current API: submit a migration over one or more bucket mappings.
    pub async fn add_migration(
        &self,
        mappings: &[BucketMapping],
        settings: &MigrationSettings,
    ) -> Result<MigrationId, ApiError> {
        let body = AddMigrationRequest {
            settings: MigrationSettingsRequest {
                name: settings.name.as_deref(),
                migration_mode: settings.mode,
                conflict_resolution: settings.conflict_resolution,
                slots_per_mapping: settings.slots_per_mapping,
            },
            mappings: mappings
                .iter()
                .map(|m| MappingRequest {
                    source_storage_account_id: m.source_account,
                    source_bucket_name: &m.source_bucket,
                    dest_storage_account_id: m.destination_account,
                    dest_bucket_name: &m.destination_bucket,
                })
                .collect(),
        };
        let response: IdResponse = self.post_json(MIGRATIONS_PATH, &body).await?;
        Ok(MigrationId(response.id))
    }

    /// Legacy API: submit a migration between two registered storages.
    pub async fn add_legacy_migration(
        &self,
        source: StorageId,
        destination: StorageId,
        settings: &MigrationSettings,
    ) -> Result<MigrationId, ApiError> {
        let body = LegacyAddMigrationRequest {
            source_id: source,
            destination_id: destination,
            count_source_objects: settings.count_source_objects,
            slots: settings.slots_per_mapping,
            migration_mode: settings.mode,
            conflict_resolution: settings.conflict_resolution,
        };
        let response: IdResponse = self.post_json(MIGRATIONS_PATH, &body).await?;
        Ok(MigrationId(response.id))
    }

    /// Fetch a migration and its current status.
    pub async fn get_migration(&self, id: MigrationId) -> Result<Migration, ApiError> {
        self.get(&format!("{}/{}", MIGRATIONS_PATH, id)).await
    }
}
