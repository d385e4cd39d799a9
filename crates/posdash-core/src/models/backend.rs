//! Backend health report returned by `GET /status`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Primary database connectivity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseStatus {
    pub status: String,
    #[serde(default)]
    pub ready_state: Option<i64>,
    pub connected: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Optional replica (Atlas) connectivity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtlasStatus {
    pub configured: bool,
    pub status: String,
    #[serde(default)]
    pub ready_state: Option<i64>,
    pub connected: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl AtlasStatus {
    /// Human-readable one-word state, e.g. `Connected` or `Not Configured`.
    #[must_use]
    pub fn summary(&self) -> String {
        if !self.configured {
            "Not Configured".to_string()
        } else if self.connected {
            "Connected".to_string()
        } else {
            self.status.replacen('_', " ", 1)
        }
    }

    /// Error worth surfacing; errors of an unconfigured replica are noise.
    #[must_use]
    pub fn visible_error(&self) -> Option<&str> {
        if self.configured {
            self.error.as_deref()
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendStatus {
    #[serde(default)]
    pub server: String,
    pub database: DatabaseStatus,
    pub atlas: AtlasStatus,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}
