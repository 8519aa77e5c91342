//! Configuration management for storefront

pub mod schema;

pub use schema::Config;

use crate::error::{StorefrontError, StorefrontResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use toml_edit::{value, DocumentMut, Item, Table};
use tracing::{debug, info};

/// Environment variable overriding `api.base_url`
pub const API_URL_ENV: &str = "STOREFRONT_API_URL";

/// Keys accepted by `storefront config set`
pub const VALID_KEYS: &[&str] = &[
    "general.log_format",
    "general.audit_log",
    "api.base_url",
    "api.timeout_secs",
    "api.login_path",
    "api.register_path",
    "api.refresh_path",
    "api.current_user_path",
    "cache.stale_time_secs",
    "cache.cart_stale_secs",
    "cache.recommended_stale_secs",
    "session.persist",
    "session.state_dir",
];

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("storefront")
            .join("config.toml")
    }

    /// Get the state directory path, honouring `session.state_dir`
    pub fn state_dir(config: &Config) -> PathBuf {
        if let Some(ref dir) = config.session.state_dir {
            return dir.clone();
        }
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("storefront")
    }

    /// Get the persisted sessions directory path
    pub fn sessions_dir(config: &Config) -> PathBuf {
        Self::state_dir(config).join("sessions")
    }

    /// Get the audit log path
    pub fn audit_log_path(config: &Config) -> PathBuf {
        Self::state_dir(config).join("audit.log")
    }

    /// Load configuration, using defaults if the file does not exist.
    ///
    /// `STOREFRONT_API_URL` overrides the configured base URL.
    pub async fn load(&self) -> StorefrontResult<Config> {
        let mut config = if self.config_path.exists() {
            self.load_from_file(&self.config_path).await?
        } else {
            debug!("Config file not found, using defaults");
            Config::default()
        };

        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                debug!("Using API URL from {}", API_URL_ENV);
                config.api.base_url = url.trim().to_string();
            }
        }

        Ok(config)
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> StorefrontResult<Config> {
        let content = fs::read_to_string(path).await.map_err(|e| {
            StorefrontError::io(format!("reading config from {}", path.display()), e)
        })?;

        toml::from_str(&content).map_err(|e| StorefrontError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> StorefrontResult<()> {
        self.ensure_config_dir().await?;

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            StorefrontError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Set a single dotted key, keeping the rest of the file (comments
    /// included) untouched.
    pub async fn set_value(&self, key: &str, raw: &str) -> StorefrontResult<()> {
        if !VALID_KEYS.contains(&key) {
            return Err(StorefrontError::User(format!("Unknown config key: {}", key)));
        }

        let mut doc = if self.config_path.exists() {
            let content = fs::read_to_string(&self.config_path).await.map_err(|e| {
                StorefrontError::io(format!("reading {}", self.config_path.display()), e)
            })?;
            content
                .parse::<DocumentMut>()
                .map_err(|e| StorefrontError::ConfigInvalid {
                    path: self.config_path.clone(),
                    reason: e.to_string(),
                })?
        } else {
            DocumentMut::new()
        };

        set_document_value(&mut doc, key, raw)?;

        // Validate the edited document against the schema before writing
        let rendered = doc.to_string();
        toml::from_str::<Config>(&rendered).map_err(|e| StorefrontError::ConfigInvalid {
            path: self.config_path.clone(),
            reason: e.to_string(),
        })?;

        self.ensure_config_dir().await?;
        fs::write(&self.config_path, rendered).await.map_err(|e| {
            StorefrontError::io(format!("writing {}", self.config_path.display()), e)
        })?;

        info!("Set {} in {}", key, self.config_path.display());
        Ok(())
    }

    /// Ensure the config directory exists
    async fn ensure_config_dir(&self) -> StorefrontResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StorefrontError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Write `raw` under a dotted `section.field` key, creating the section.
fn set_document_value(doc: &mut DocumentMut, key: &str, raw: &str) -> StorefrontResult<()> {
    let (section, field) = key
        .split_once('.')
        .ok_or_else(|| StorefrontError::User(format!("Expected section.field, got: {}", key)))?;

    if !doc.contains_table(section) {
        doc.insert(section, Item::Table(Table::new()));
    }
    let table = doc[section]
        .as_table_mut()
        .ok_or_else(|| StorefrontError::User(format!("Expected table at key: {}", section)))?;

    let item = if raw == "true" || raw == "false" {
        value(raw == "true")
    } else if let Ok(n) = raw.parse::<i64>() {
        value(n)
    } else {
        value(raw)
    };
    table.insert(field, item);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[tokio::test]
    #[serial]
    async fn load_default_when_missing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nonexistent.toml");
        let manager = ConfigManager::with_path(path);

        let config = manager.load().await.unwrap();
        assert_eq!(config.api.login_path, "/api/auth/login/");
    }

    #[tokio::test]
    #[serial]
    async fn save_and_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        let manager = ConfigManager::with_path(path);

        let mut config = Config::default();
        config.api.base_url = "https://shop.test".to_string();

        manager.save(&config).await.unwrap();
        let loaded = manager.load().await.unwrap();

        assert_eq!(loaded.api.base_url, "https://shop.test");
    }

    #[tokio::test]
    #[serial]
    async fn env_overrides_base_url() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(temp.path().join("config.toml"));

        std::env::set_var(API_URL_ENV, "https://env.example");
        let config = manager.load().await;
        std::env::remove_var(API_URL_ENV);

        assert_eq!(config.unwrap().api.base_url, "https://env.example");
    }

    #[tokio::test]
    #[serial]
    async fn set_value_preserves_comments() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "# shop settings\n[api]\nbase_url = \"http://a\"\n").unwrap();
        let manager = ConfigManager::with_path(path.clone());

        manager.set_value("api.timeout_secs", "5").await.unwrap();
        manager.set_value("session.persist", "false").await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("# shop settings"));

        let config = manager.load().await.unwrap();
        assert_eq!(config.api.timeout_secs, 5);
        assert_eq!(config.api.base_url, "http://a");
        assert!(!config.session.persist);
    }

    #[tokio::test]
    async fn set_value_rejects_unknown_key() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(temp.path().join("config.toml"));
        let err = manager.set_value("vm.name", "x").await.unwrap_err();
        assert!(err.to_string().contains("Unknown config key"));
    }

    #[tokio::test]
    async fn set_value_rejects_wrong_type() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(temp.path().join("config.toml"));
        let err = manager.set_value("api.timeout_secs", "soon").await.unwrap_err();
        assert!(matches!(err, StorefrontError::ConfigInvalid { .. }));
    }

    #[test]
    fn state_dir_override() {
        let mut config = Config::default();
        config.session.state_dir = Some(PathBuf::from("/tmp/shop-state"));
        assert_eq!(
            ConfigManager::sessions_dir(&config),
            PathBuf::from("/tmp/shop-state/sessions")
        );
        assert_eq!(
            ConfigManager::audit_log_path(&config),
            PathBuf::from("/tmp/shop-state/audit.log")
        );
    }
}
