//! Persistence of the node configuration record.
//!
//! The record lives in `config.json` as pretty-printed JSON with a trailing
//! newline so operators can read and edit it by hand.

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{ConfigError, Result};

use super::paths::DeployPaths;
use super::spec::NodeConfig;

/// Trait for configuration storage backends.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Checks if a configuration record exists.
    async fn exists(&self) -> Result<bool>;

    /// Loads the configuration record.
    ///
    /// A missing or malformed file is an error: callers only load after
    /// checking [`ConfigStore::exists`].
    async fn load(&self) -> Result<NodeConfig>;

    /// Saves the configuration record, creating the seed directory if needed.
    async fn save(&self, config: &NodeConfig) -> Result<()>;

    /// Deletes the configuration record.
    async fn delete(&self) -> Result<()>;

    /// Location of the record, for messages.
    fn location(&self) -> String;
}

/// File-based configuration store inside the seed directory.
#[derive(Debug, Clone)]
pub struct LocalConfigStore {
    /// Directory holding the config file.
    base_dir: PathBuf,
    /// Path to the config file.
    config_path: PathBuf,
}

impl LocalConfigStore {
    /// Creates a store for the given path set.
    #[must_use]
    pub fn new(paths: &DeployPaths) -> Self {
        Self {
            base_dir: paths.seed_dir.clone(),
            config_path: paths.config_path.clone(),
        }
    }

    fn write_error(&self, message: impl Into<String>) -> ConfigError {
        ConfigError::WriteFailed {
            path: self.config_path.clone(),
            message: message.into(),
        }
    }
}

/// Serializes a record the way it is stored on disk.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_file_contents(config: &NodeConfig) -> Result<String> {
    let mut content = serde_json::to_string_pretty(config).map_err(|e| ConfigError::ParseError {
        message: format!("Failed to serialize config: {e}"),
        location: None,
    })?;
    content.push('\n');
    Ok(content)
}

#[async_trait]
impl ConfigStore for LocalConfigStore {
    async fn exists(&self) -> Result<bool> {
        Ok(fs::try_exists(&self.config_path).await?)
    }

    async fn load(&self) -> Result<NodeConfig> {
        if !fs::try_exists(&self.config_path).await? {
            return Err(ConfigError::FileNotFound {
                path: self.config_path.clone(),
            }
            .into());
        }

        debug!("Loading config from: {}", self.config_path.display());

        let content = fs::read_to_string(&self.config_path).await.map_err(|e| ConfigError::ParseError {
            message: format!("Failed to read config file: {e}"),
            location: Some(self.config_path.display().to_string()),
        })?;

        let config: NodeConfig = serde_json::from_str(&content).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
            location: Some(self.config_path.display().to_string()),
        })?;

        Ok(config)
    }

    async fn save(&self, config: &NodeConfig) -> Result<()> {
        fs::create_dir_all(&self.base_dir)
            .await
            .map_err(|e| self.write_error(format!("Failed to create {}: {e}", self.base_dir.display())))?;

        let content = to_file_contents(config)?;

        // Write to a temporary file first, then rename for atomicity
        let temp_path = self.config_path.with_extension("json.tmp");

        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| self.write_error(format!("Failed to create temp file: {e}")))?;
        file.write_all(content.as_bytes())
            .await
            .map_err(|e| self.write_error(e.to_string()))?;
        file.sync_all().await.map_err(|e| self.write_error(e.to_string()))?;

        fs::rename(&temp_path, &self.config_path)
            .await
            .map_err(|e| self.write_error(format!("Failed to rename temp file: {e}")))?;

        debug!("Config saved to: {}", self.config_path.display());
        Ok(())
    }

    async fn delete(&self) -> Result<()> {
        if fs::try_exists(&self.config_path).await? {
            info!("Deleting config file: {}", self.config_path.display());
            fs::remove_file(&self.config_path).await?;
        }
        Ok(())
    }

    fn location(&self) -> String {
        self.config_path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Environment, LogLevel};
    use crate::testing::sample_config;
    use tempfile::TempDir;

    fn create_test_store() -> (LocalConfigStore, DeployPaths, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let paths = DeployPaths::new(temp_dir.path().join("seed"));
        (LocalConfigStore::new(&paths), paths, temp_dir)
    }

    #[tokio::test]
    async fn test_exists_and_create_dir() {
        let (store, paths, _temp) = create_test_store();
        assert!(!store.exists().await.expect("exists"));

        store.save(&sample_config()).await.expect("save");

        assert!(store.exists().await.expect("exists"));
        assert!(paths.seed_dir.is_dir());
    }

    #[tokio::test]
    async fn test_round_trip() {
        let (store, _paths, _temp) = create_test_store();
        let mut original = sample_config();
        original.domain = String::from("https://roundtrip.example.com");
        original.compose_sha = String::from("abc123");
        original.compose_envs.log_level = LogLevel::Debug;
        original.environment = Environment::Dev;
        original.release_channel = String::from("dev");
        original.testnet = true;
        original.analytics = true;
        original.gateway = true;
        original.last_script_run = String::from("2026-01-15T10:30:00Z");

        store.save(&original).await.expect("save");
        let loaded = store.load().await.expect("load");

        assert_eq!(loaded, original);
    }

    #[tokio::test]
    async fn test_file_format() {
        let (store, paths, _temp) = create_test_store();
        store.save(&sample_config()).await.expect("save");

        let raw = std::fs::read_to_string(&paths.config_path).expect("read");
        assert!(raw.ends_with("}\n"));
        assert!(raw.contains("\n  \"domain\""));
        serde_json::from_str::<serde_json::Value>(&raw).expect("valid json");
        assert!(!paths.seed_dir.join("config.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_overwrite() {
        let (store, _paths, _temp) = create_test_store();
        let mut config = sample_config();
        config.domain = String::from("https://first.com");
        store.save(&config).await.expect("save");
        config.domain = String::from("https://second.com");
        store.save(&config).await.expect("save");

        assert_eq!(store.load().await.expect("load").domain, "https://second.com");
    }

    #[tokio::test]
    async fn test_load_errors() {
        let (store, paths, _temp) = create_test_store();
        assert!(store.load().await.is_err());

        std::fs::create_dir_all(&paths.seed_dir).expect("mkdir");
        std::fs::write(&paths.config_path, "not json").expect("write");
        let err = store.load().await.expect_err("invalid json");
        assert!(err.to_string().contains("parse"));
    }

    #[tokio::test]
    async fn test_delete() {
        let (store, _paths, _temp) = create_test_store();
        store.save(&sample_config()).await.expect("save");
        store.delete().await.expect("delete");
        assert!(!store.exists().await.expect("exists"));
        store.delete().await.expect("delete twice");
    }
}
