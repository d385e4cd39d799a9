//! Client configuration.
//!
//! A `ClientConfig` is resolved once at startup from, in priority order,
//! explicit overrides, `POSDASH_*` environment variables, the JSON config file
//! and built-in defaults. Base URLs are fixed for the life of the process.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::{is_http_url, normalize_text_option};

const CONFIG_FILE_NAME: &str = "config.json";
const DEFAULT_API_BASE_URL: &str = "http://localhost:5000";

pub const ENV_API_URL: &str = "POSDASH_API_URL";
pub const ENV_PUSH_URL: &str = "POSDASH_PUSH_URL";
pub const ENV_TIMEOUT_SECS: &str = "POSDASH_TIMEOUT_SECS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("Failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    pub api_base_url: String,
    /// Push channel host; the API base URL when unset
    pub push_url: Option<String>,
    pub request_timeout_secs: u64,
    pub reconnect_delay_ms: u64,
    pub reconnect_attempts: u32,
    pub health_poll_interval_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            push_url: None,
            request_timeout_secs: 10,
            reconnect_delay_ms: 1000,
            reconnect_attempts: 5,
            health_poll_interval_secs: 5,
        }
    }
}

/// Values supplied on the command line; they win over every other source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub api_base_url: Option<String>,
    pub push_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

impl ClientConfig {
    /// Resolve configuration from file, environment and overrides.
    pub fn resolve(config_path: Option<&Path>, overrides: ConfigOverrides) -> ConfigResult<Self> {
        let path = config_path.map_or_else(default_config_path, Path::to_path_buf);
        let mut config = Self::load_from_path(&path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.apply_overrides(overrides);
        config.normalize()?;
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str::<Self>(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> ConfigResult<()> {
        if let Some(url) = normalize_text_option(var(ENV_API_URL)) {
            self.api_base_url = url;
        }
        if let Some(url) = normalize_text_option(var(ENV_PUSH_URL)) {
            self.push_url = Some(url);
        }
        if let Some(raw) = normalize_text_option(var(ENV_TIMEOUT_SECS)) {
            self.request_timeout_secs = raw.parse().map_err(|_| {
                ConfigError::Invalid(format!("{ENV_TIMEOUT_SECS} must be a whole number"))
            })?;
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(url) = normalize_text_option(overrides.api_base_url) {
            self.api_base_url = url;
        }
        if let Some(url) = normalize_text_option(overrides.push_url) {
            self.push_url = Some(url);
        }
        if let Some(timeout) = overrides.request_timeout_secs {
            self.request_timeout_secs = timeout;
        }
    }

    fn normalize(&mut self) -> ConfigResult<()> {
        self.api_base_url = normalize_http_url(&self.api_base_url, "api_base_url")?;
        self.push_url = normalize_text_option(self.push_url.take())
            .map(|url| normalize_http_url(&url, "push_url"))
            .transpose()?;
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.health_poll_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "health_poll_interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Host the push channel connects to.
    pub fn push_base_url(&self) -> &str {
        self.push_url.as_deref().unwrap_or(&self.api_base_url)
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub const fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub const fn health_poll_interval(&self) -> Duration {
        Duration::from_secs(self.health_poll_interval_secs)
    }
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("posdash")
        .join(CONFIG_FILE_NAME)
}

/// Trim, require an `http(s)://` scheme and strip trailing slashes.
pub fn normalize_http_url(raw: &str, field: &str) -> ConfigResult<String> {
    let value = normalize_text_option(Some(raw.to_string()))
        .ok_or_else(|| ConfigError::Invalid(format!("{field} must not be empty")))?;
    if is_http_url(&value) {
        Ok(value.trim_end_matches('/').to_string())
    } else {
        Err(ConfigError::Invalid(format!(
            "{field} must include http:// or https://"
        )))
    }
}
