//! Migration state vocabularies.
//!
//! The control plane exists in two generations whose state strings are
//! disjoint. Each generation gets one immutable lookup table; everything that
//! needs to know whether a state is terminal goes through [`ProtocolVersion`].

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use super::migration::MigrationStatus;

/// Which generation of the control-plane API is in use.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolVersion {
    Legacy,
    #[default]
    Current,
}

impl FromStr for ProtocolVersion {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "legacy" | "v1" => Ok(ProtocolVersion::Legacy),
            "current" | "v2" => Ok(ProtocolVersion::Current),
            _ => Err(anyhow::anyhow!("Invalid API version: {}", s)),
        }
    }
}

impl Display for ProtocolVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ProtocolVersion::Legacy => write!(f, "legacy"),
            ProtocolVersion::Current => write!(f, "current"),
        }
    }
}

/// Classification of a raw state string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateClass {
    NonTerminal,
    TerminalSuccess,
    /// Canceled or stopped. Terminal without success.
    TerminalStopped,
    TerminalFailure,
    /// Not present in the active table.
    TerminalUnknown,
}

impl StateClass {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StateClass::NonTerminal)
    }
}

/// How the progress line for a state is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Detail {
    None,
    Fixed(&'static str),
    BytesProcessed,
    ObjectsFailed,
}

struct StateEntry {
    state: &'static str,
    class: StateClass,
    detail: Detail,
}

const fn entry(state: &'static str, class: StateClass, detail: Detail) -> StateEntry {
    StateEntry {
        state,
        class,
        detail,
    }
}

static LEGACY_STATES: &[StateEntry] = &[
    entry("NOT_ASSIGNED", StateClass::NonTerminal, Detail::Fixed("assigning")),
    entry("IN_PROGRESS", StateClass::NonTerminal, Detail::BytesProcessed),
    entry("IN_PROGRESS_CANCELING", StateClass::NonTerminal, Detail::None),
    entry("CANCELED", StateClass::TerminalStopped, Detail::None),
    entry("SUCCEEDED", StateClass::TerminalSuccess, Detail::None),
    entry("FAILED", StateClass::TerminalFailure, Detail::None),
];

static CURRENT_STATES: &[StateEntry] = &[
    entry(
        "DEPLOYING",
        StateClass::NonTerminal,
        Detail::Fixed("deploying engines"),
    ),
    entry("WAITING", StateClass::NonTerminal, Detail::None),
    entry("STARTING", StateClass::NonTerminal, Detail::None),
    entry("RESTARTING", StateClass::NonTerminal, Detail::None),
    entry("IN_PROGRESS", StateClass::NonTerminal, Detail::BytesProcessed),
    entry("STOPPING", StateClass::NonTerminal, Detail::None),
    entry("STOPPED", StateClass::TerminalStopped, Detail::None),
    entry("SUCCEEDED", StateClass::TerminalSuccess, Detail::ObjectsFailed),
    entry("FAILED", StateClass::TerminalFailure, Detail::None),
    entry(
        "NO_CONNECTION_TO_ENGINE",
        StateClass::TerminalFailure,
        Detail::None,
    ),
];

impl ProtocolVersion {
    fn table(&self) -> &'static [StateEntry] {
        match self {
            ProtocolVersion::Legacy => LEGACY_STATES,
            ProtocolVersion::Current => CURRENT_STATES,
        }
    }

    fn lookup(&self, state: &str) -> Option<&'static StateEntry> {
        self.table().iter().find(|e| e.state == state)
    }

    /// All state strings this generation knows about, in table order.
    pub fn known_states(&self) -> impl Iterator<Item = &'static str> {
        self.table().iter().map(|e| e.state)
    }

    pub fn classify(&self, state: &str) -> StateClass {
        self.lookup(state)
            .map(|e| e.class)
            .unwrap_or(StateClass::TerminalUnknown)
    }

    /// Failed-object count for a status whose table entry tracks it, when
    /// non-zero. Entries that do not track failures always yield `None`.
    pub fn failed_objects(&self, status: &MigrationStatus) -> Option<u64> {
        let entry = self.lookup(&status.state)?;
        match (entry.detail, status.objects_failed) {
            (Detail::ObjectsFailed, Some(failed)) if failed > 0 => Some(failed),
            _ => None,
        }
    }

    /// Human-readable progress detail for a status, if the table defines one.
    pub fn describe(&self, status: &MigrationStatus) -> Option<String> {
        let entry = self.lookup(&status.state)?;
        match entry.detail {
            Detail::None => None,
            Detail::Fixed(text) => Some(text.to_string()),
            Detail::BytesProcessed => match status.bytes_processed {
                Some(bytes) if bytes > 0 => Some(format!("{} bytes processed", bytes)),
                _ => Some("starting".to_string()),
            },
            Detail::ObjectsFailed => match status.objects_failed {
                Some(failed) if failed > 0 => Some(format!("{} failed objects", failed)),
                _ => None,
            },
        }
    }
}
