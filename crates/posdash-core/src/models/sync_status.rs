//! Server-side sync progress messages

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which collection a `sync:request` asks the server to reconcile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncCollection {
    Guests,
    Orders,
    #[default]
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncDirection {
    Pull,
    Push,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncPhase {
    Processing,
    Success,
    Error,
    Completed,
}

impl SyncPhase {
    /// Whether this message ends a sync run.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

/// A `sync:status` progress event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatusMessage {
    #[serde(rename = "type")]
    pub direction: SyncDirection,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub collection: String,
    pub status: SyncPhase,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub document_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub synced_count: Option<u64>,
    #[serde(default)]
    pub total_count: Option<u64>,
    #[serde(default)]
    pub errors: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}
