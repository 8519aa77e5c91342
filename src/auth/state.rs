//! Authentication state and failures

use crate::error::{extract_message, StorefrontError};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// Where the user's session stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    LoggedOut,
    LoggingIn,
    LoggedIn,
    /// The credential was dropped after a failed renewal
    SessionExpired,
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AuthState::LoggedOut => "logged out",
            AuthState::LoggingIn => "logging in",
            AuthState::LoggedIn => "logged in",
            AuthState::SessionExpired => "session expired",
        };
        f.write_str(s)
    }
}

/// Shared, observable auth state
#[derive(Debug, Clone)]
pub struct AuthStateHandle {
    sender: Arc<watch::Sender<AuthState>>,
}

impl AuthStateHandle {
    pub fn new(initial: AuthState) -> Self {
        let (sender, _) = watch::channel(initial);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn get(&self) -> AuthState {
        *self.sender.borrow()
    }

    pub fn set(&self, state: AuthState) {
        let previous = self.sender.send_replace(state);
        if previous != state {
            info!("Auth state: {} -> {}", previous, state);
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.sender.subscribe()
    }
}

impl Default for AuthStateHandle {
    fn default() -> Self {
        Self::new(AuthState::LoggedOut)
    }
}

/// Failure reported by the auth controller: a message for the user and,
/// for validation failures, the server's payload verbatim
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct AuthFailure {
    pub message: String,
    pub payload: Option<Value>,
    pub expired: bool,
}

impl AuthFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            payload: None,
            expired: false,
        }
    }

    /// Describe `error`, using `fallback` when the server gave no readable text
    pub fn from_error(error: StorefrontError, fallback: &str) -> Self {
        let payload = error.payload().cloned();
        let message = match &error {
            StorefrontError::Validation { payload, .. } => {
                extract_message(payload).unwrap_or_else(|| fallback.to_string())
            }
            StorefrontError::Unauthorized { message } | StorefrontError::Server { message, .. } => {
                message.clone()
            }
            other => other.to_string(),
        };
        Self {
            message,
            payload,
            expired: error.is_session_expired(),
        }
    }
}

impl From<AuthFailure> for StorefrontError {
    fn from(failure: AuthFailure) -> Self {
        if failure.expired {
            StorefrontError::SessionExpired
        } else {
            StorefrontError::User(failure.message)
        }
    }
}
