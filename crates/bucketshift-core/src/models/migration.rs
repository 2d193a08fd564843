use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use super::storage_account::StorageAccountId;

/// Identifier the control plane assigns to a migration job. Never changes once issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MigrationId(pub i64);

impl Display for MigrationId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MigrationId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(MigrationId)
            .map_err(|_| anyhow::anyhow!("Invalid migration id: {}", s))
    }
}

/// One copy unit within a migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketMapping {
    pub source_account: StorageAccountId,
    pub source_bucket: String,
    pub destination_account: StorageAccountId,
    pub destination_bucket: String,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MigrationMode {
    #[default]
    Copy,
    Move,
}

impl Display for MigrationMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            MigrationMode::Copy => write!(f, "COPY"),
            MigrationMode::Move => write!(f, "MOVE"),
        }
    }
}

impl FromStr for MigrationMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "COPY" => Ok(MigrationMode::Copy),
            "MOVE" => Ok(MigrationMode::Move),
            _ => Err(anyhow::anyhow!("Invalid migration mode: {}", s)),
        }
    }
}

/// Whether an object already present at the destination gets overwritten.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConflictResolution {
    /// Overwrite only if the source object is newer.
    #[default]
    Newer,
    Always,
    Never,
}

impl Display for ConflictResolution {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ConflictResolution::Newer => write!(f, "NEWER"),
            ConflictResolution::Always => write!(f, "ALWAYS"),
            ConflictResolution::Never => write!(f, "NEVER"),
        }
    }
}

impl FromStr for ConflictResolution {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "NEWER" => Ok(ConflictResolution::Newer),
            "ALWAYS" => Ok(ConflictResolution::Always),
            "NEVER" => Ok(ConflictResolution::Never),
            _ => Err(anyhow::anyhow!("Invalid conflict resolution policy: {}", s)),
        }
    }
}

pub const DEFAULT_SLOTS_PER_MAPPING: u32 = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationSettings {
    pub mode: MigrationMode,
    pub conflict_resolution: ConflictResolution,
    pub name: Option<String>,
    /// Engine slots assigned to each mapping.
    pub slots_per_mapping: u32,
    /// Legacy API only: count source objects before copying.
    pub count_source_objects: bool,
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            mode: MigrationMode::Copy,
            conflict_resolution: ConflictResolution::Newer,
            name: None,
            slots_per_mapping: DEFAULT_SLOTS_PER_MAPPING,
            count_source_objects: false,
        }
    }
}

/// Status block reported by the control plane. Owned and updated by the remote side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationStatus {
    pub state: String,
    #[serde(default, alias = "bytesProcessed")]
    pub bytes_processed: Option<u64>,
    #[serde(default, alias = "objectsFailed")]
    pub objects_failed: Option<u64>,
}

impl MigrationStatus {
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            bytes_processed: None,
            objects_failed: None,
        }
    }

    pub fn with_bytes_processed(mut self, bytes: u64) -> Self {
        self.bytes_processed = Some(bytes);
        self
    }

    pub fn with_objects_failed(mut self, objects: u64) -> Self {
        self.objects_failed = Some(objects);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Migration {
    pub id: MigrationId,
    pub stat: MigrationStatus,
}
