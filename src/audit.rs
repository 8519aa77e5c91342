//! Audit trail of session events
//!
//! Appends JSON lines to `audit.log` in the state directory. Tokens are never
//! written; entries carry the API origin and, where known, the account email.

use crate::config::{schema::Config, ConfigManager};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;
use tracing::warn;

pub const LOGIN: &str = "auth.login";
pub const REGISTER: &str = "auth.register";
pub const LOGOUT: &str = "auth.logout";
pub const SESSION_EXPIRED: &str = "auth.session_expired";

/// File-based audit logger that appends JSON lines
#[derive(Debug, Clone)]
pub struct AuditLog {
    enabled: bool,
    path: PathBuf,
    // Writes started by `spawn_log` that `flush` has not awaited yet
    pending: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl AuditLog {
    pub fn new(config: &Config) -> Self {
        Self {
            enabled: config.general.audit_log,
            path: ConfigManager::audit_log_path(config),
            pending: Arc::default(),
        }
    }

    /// Logger that drops every event
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            path: PathBuf::new(),
            pending: Arc::default(),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Append one event. IO failures are logged and swallowed.
    pub async fn log(&self, event: &str, data: &serde_json::Value) {
        if !self.enabled {
            return;
        }

        let entry = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "event": event,
            "data": data,
        });

        let mut line = match serde_json::to_string(&entry) {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to serialize audit event: {}", e);
                return;
            }
        };
        line.push('\n');

        if let Err(e) = self.append(&line).await {
            warn!("Failed to write audit log: {}", e);
        }
    }

    /// Variant for synchronous callers inside a runtime. The write runs in
    /// the background until [`AuditLog::flush`] waits for it.
    pub fn spawn_log(&self, event: &'static str, data: serde_json::Value) {
        if !self.enabled {
            return;
        }
        let audit = self.clone();
        let handle = tokio::spawn(async move { audit.log(event, &data).await });
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handle);
    }

    /// Wait for every write started by `spawn_log`
    pub async fn flush(&self) {
        let handles = std::mem::take(
            &mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner),
        );
        for handle in handles {
            if let Err(e) = handle.await {
                warn!("Audit write did not finish: {}", e);
            }
        }
    }

    async fn append(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
