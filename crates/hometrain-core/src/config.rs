//! Configuration model.
//!
//! Loaded from `config.toml` by the infrastructure layer. Every field has a
//! default so a missing or partial file still yields a usable configuration.

use crate::error::{HomeTrainError, Result};
use crate::warmup::FitnessLevel;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3010";
pub const DEFAULT_TIMEOUT_SECS: u64 = 8;
pub const DEFAULT_SNAPSHOT_TIMEOUT_SECS: u64 = 3;

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct RootConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl RootConfig {
    /// Checks values that serde cannot.
    pub fn validate(&self) -> Result<()> {
        let url = self.api.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(HomeTrainError::config(format!(
                "api.base_url must be an http(s) URL, got '{url}'"
            )));
        }
        if self.api.timeout_secs == 0 {
            return Err(HomeTrainError::config("api.timeout_secs must be positive"));
        }
        if self.session.snapshot_timeout_secs == 0 {
            return Err(HomeTrainError::config(
                "session.snapshot_timeout_secs must be positive",
            ));
        }
        Ok(())
    }
}

/// Remote store settings.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Timeout applied to every remote call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Bearer token. Usually supplied through `HOMETRAIN_TOKEN` instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            token: None,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct SessionConfig {
    #[serde(default)]
    pub skip_warmup: bool,
    #[serde(default)]
    pub level: FitnessLevel,
    /// Start the next warm-up step automatically when one ends.
    #[serde(default = "default_true")]
    pub auto_continue_warmup: bool,
    /// Upper bound for the snapshot written when the session is backgrounded.
    #[serde(default = "default_snapshot_timeout_secs")]
    pub snapshot_timeout_secs: u64,
}

impl SessionConfig {
    pub fn snapshot_timeout(&self) -> Duration {
        Duration::from_secs(self.snapshot_timeout_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            skip_warmup: false,
            level: FitnessLevel::default(),
            auto_continue_warmup: true,
            snapshot_timeout_secs: DEFAULT_SNAPSHOT_TIMEOUT_SECS,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `hometrain_application=debug`.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Also write a daily rolling log file.
    #[serde(default = "default_true")]
    pub file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: true,
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_snapshot_timeout_secs() -> u64 {
    DEFAULT_SNAPSHOT_TIMEOUT_SECS
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}
