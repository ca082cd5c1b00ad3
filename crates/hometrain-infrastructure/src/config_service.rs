//! Configuration service implementation.
//!
//! Loads the root configuration from `~/.config/hometrain/config.toml` (or an
//! explicit path), applies environment overrides and caches the result.

use crate::paths::HomeTrainPaths;
use hometrain_core::config::RootConfig;
use hometrain_core::error::{HomeTrainError, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Overrides `api.base_url`.
pub const ENV_API_URL: &str = "HOMETRAIN_API_URL";
/// Overrides `api.token`.
pub const ENV_TOKEN: &str = "HOMETRAIN_TOKEN";
/// Overrides `logging.level`.
pub const ENV_LOG: &str = "HOMETRAIN_LOG";

/// Configuration service that loads and caches the root configuration.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: Option<PathBuf>,
    /// Cached configuration. Uses RwLock for thread-safe lazy loading.
    config: Arc<RwLock<Option<RootConfig>>>,
}

impl ConfigService {
    /// Service reading the default config file location.
    pub fn new() -> Self {
        Self {
            path: None,
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Service reading `path` instead of the default location.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Gets the root configuration, loading it if not cached.
    ///
    /// Environment overrides are applied on load.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed, or
    /// if the resulting configuration is invalid.
    pub fn get_config(&self) -> Result<RootConfig> {
        if let Ok(read_lock) = self.config.read() {
            if let Some(cached) = read_lock.as_ref() {
                return Ok(cached.clone());
            }
        }

        let path = self.config_path()?;
        let mut loaded = Self::load_from(&path)?;
        apply_env_overrides(&mut loaded, |key| std::env::var(key).ok());
        loaded.validate()?;

        if let Ok(mut write_lock) = self.config.write() {
            *write_lock = Some(loaded.clone());
        }

        Ok(loaded)
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        if let Ok(mut write_lock) = self.config.write() {
            *write_lock = None;
        }
    }

    /// Reads a configuration file. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<RootConfig> {
        if !path.exists() {
            tracing::debug!(
                "[ConfigService] {} not found, using defaults",
                path.display()
            );
            return Ok(RootConfig::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: RootConfig = toml::from_str(&content)?;
        tracing::debug!("[ConfigService] Loaded {}", path.display());
        Ok(config)
    }

    /// Writes a configuration file, creating its directory if needed.
    pub fn save_to(path: &Path, config: &RootConfig) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(config)?)?;
        Ok(())
    }

    fn config_path(&self) -> Result<PathBuf> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => HomeTrainPaths::config_file().map_err(|e| HomeTrainError::config(e.to_string())),
        }
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies `HOMETRAIN_*` overrides read through `lookup`.
///
/// Blank values are ignored.
pub fn apply_env_overrides<F>(config: &mut RootConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(url) = get(ENV_API_URL) {
        config.api.base_url = url;
    }
    if let Some(token) = get(ENV_TOKEN) {
        config.api.token = Some(token);
    }
    if let Some(level) = get(ENV_LOG) {
        config.logging.level = level;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hometrain_core::warmup::FitnessLevel;
    use std::collections::HashMap;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigService::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, RootConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");

        let mut config = RootConfig::default();
        config.session.level = FitnessLevel::Beginner;
        config.session.skip_warmup = true;
        ConfigService::save_to(&path, &config).unwrap();

        let service = ConfigService::with_path(&path);
        let loaded = service.get_config().unwrap();
        assert_eq!(loaded.session.level, FitnessLevel::Beginner);
        assert!(loaded.session.skip_warmup);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[api\nbase_url = ").unwrap();

        let err = ConfigService::with_path(&path).get_config().unwrap_err();
        assert!(matches!(err, HomeTrainError::Serialization { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_API_URL, "https://api.example.com"),
            (ENV_TOKEN, "secret"),
            (ENV_LOG, "  "),
        ]);

        let mut config = RootConfig::default();
        apply_env_overrides(&mut config, |key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.api.base_url, "https://api.example.com");
        assert_eq!(config.api.token.as_deref(), Some("secret"));
        assert_eq!(config.logging.level, "info");
    }
}
