//! Configuration schema for storefront
//!
//! Configuration is stored at `~/.config/storefront/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Remote API settings
    pub api: ApiConfig,

    /// Query cache settings
    pub cache: CacheConfig,

    /// Session persistence settings
    pub session: SessionConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,

    /// Enable audit logging of session transitions
    pub audit_log: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            audit_log: true,
        }
    }
}

/// Remote REST API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the storefront API
    pub base_url: String,

    /// Global request timeout in seconds
    pub timeout_secs: u64,

    /// Login endpoint (public)
    pub login_path: String,

    /// Registration endpoint (public)
    pub register_path: String,

    /// Token refresh endpoint (public)
    pub refresh_path: String,

    /// Current user endpoint
    pub current_user_path: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 30,
            login_path: "/api/auth/login/".to_string(),
            register_path: "/api/auth/register/".to_string(),
            refresh_path: "/api/auth/token/refresh/".to_string(),
            current_user_path: "/api/auth/me/".to_string(),
        }
    }
}

impl ApiConfig {
    /// Request timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Paths that never carry a bearer credential
    pub fn public_paths(&self) -> [&str; 3] {
        [
            self.login_path.as_str(),
            self.register_path.as_str(),
            self.refresh_path.as_str(),
        ]
    }
}

/// Query cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Default staleness window in seconds (0 = always revalidate)
    pub stale_time_secs: u64,

    /// Staleness window for the cart
    pub cart_stale_secs: u64,

    /// Staleness window for product recommendations
    pub recommended_stale_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_time_secs: 0,
            cart_stale_secs: 30,
            recommended_stale_secs: 300,
        }
    }
}

impl CacheConfig {
    pub fn stale_time(&self) -> Duration {
        Duration::from_secs(self.stale_time_secs)
    }

    pub fn cart_stale_time(&self) -> Duration {
        Duration::from_secs(self.cart_stale_secs)
    }

    pub fn recommended_stale_time(&self) -> Duration {
        Duration::from_secs(self.recommended_stale_secs)
    }
}

/// Session persistence settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Persist credentials between runs (false keeps them in memory only)
    pub persist: bool,

    /// Override for the state directory (sessions, audit log)
    pub state_dir: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            persist: true,
            state_dir: None,
        }
    }
}
