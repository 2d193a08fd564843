//! Storage account models: provider binding, credentials and remote identifiers.

use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Identifier the control plane assigns to a registered storage account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageAccountId(pub i64);

impl Display for StorageAccountId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a bucket registered under a storage account (legacy API only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageId(pub i64);

impl Display for StorageId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

/// Cloud storage provider identifier as understood by the control plane.
///
/// Well-known values can be parsed by name (`s3`, `azure`); any other
/// provider is addressed by its numeric id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(pub i64);

impl ProviderId {
    pub const AMAZON_S3: ProviderId = ProviderId(1);
    pub const AZURE_BLOB: ProviderId = ProviderId(2);
}

impl FromStr for ProviderId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "s3" | "amazon" | "aws" => Ok(ProviderId::AMAZON_S3),
            "azure" | "azure-blob" => Ok(ProviderId::AZURE_BLOB),
            other => other
                .parse::<i64>()
                .map(ProviderId)
                .map_err(|_| anyhow::anyhow!("Invalid storage provider: {}", s)),
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match *self {
            ProviderId::AMAZON_S3 => write!(f, "1 (Amazon S3)"),
            ProviderId::AZURE_BLOB => write!(f, "2 (Azure Blob Storage)"),
            ProviderId(other) => write!(f, "{}", other),
        }
    }
}

/// Everything needed to register a storage account on the control plane.
#[derive(Clone, PartialEq, Eq)]
pub struct StorageAccountSpec {
    pub provider: ProviderId,
    /// Access key id or account name.
    pub identity: String,
    /// Secret key. Redacted from `Debug` output.
    pub credential: String,
    pub use_tls: bool,
}

impl StorageAccountSpec {
    pub fn new(
        provider: ProviderId,
        identity: impl Into<String>,
        credential: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            identity: identity.into(),
            credential: credential.into(),
            use_tls: true,
        }
    }

    pub fn with_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = use_tls;
        self
    }
}

impl Debug for StorageAccountSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("StorageAccountSpec")
            .field("provider", &self.provider)
            .field("identity", &self.identity)
            .field("credential", &"<redacted>")
            .field("use_tls", &self.use_tls)
            .finish()
    }
}

/// Provider entry returned by provider discovery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageProvider {
    pub id: ProviderId,
    #[serde(default)]
    pub name: Option<String>,
    /// Endpoint template, e.g. `s3.amazonaws.com` or `{identity}.blob.core.windows.net`.
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// Find the provider whose endpoint template matches `endpoint` exactly.
pub fn find_provider_by_endpoint<'a>(
    providers: &'a [StorageProvider],
    endpoint: &str,
) -> Option<&'a StorageProvider> {
    providers
        .iter()
        .find(|p| p.endpoint.as_deref() == Some(endpoint))
}
