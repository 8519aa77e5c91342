//! Error types for the storefront gateway
//!
//! All modules use `StorefrontResult<T>` as their return type.

use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for storefront operations
pub type StorefrontResult<T> = Result<T, StorefrontError>;

/// All errors that can occur in the storefront gateway
#[derive(Error, Debug)]
pub enum StorefrontError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(String),

    // Session errors
    #[error("Not signed in")]
    NotAuthenticated,

    #[error("Session expired, please sign in again")]
    SessionExpired,

    #[error("Failed to persist session: {0}")]
    SessionPersist(String),

    // Transport errors
    #[error("Request to {url} failed: {reason}")]
    Network { url: String, reason: String },

    #[error("Malformed response from {path} (HTTP {status}): {reason}")]
    MalformedResponse {
        path: String,
        status: u16,
        reason: String,
    },

    // API errors
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("{message}")]
    Validation {
        status: u16,
        message: String,
        payload: Value,
    },

    #[error("Server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl StorefrontError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a network error for a request URL
    pub fn network(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Network {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Map a non-success HTTP status and its decoded body to an error.
    ///
    /// 401 becomes `Unauthorized`, other 4xx become `Validation` carrying the
    /// payload verbatim, everything else is a `Server` error.
    pub fn from_status(status: u16, payload: Value) -> Self {
        let message = extract_message(&payload)
            .unwrap_or_else(|| format!("Request failed with HTTP {}", status));
        match status {
            401 => Self::Unauthorized { message },
            400..=499 => Self::Validation {
                status,
                message,
                payload,
            },
            _ => Self::Server { status, message },
        }
    }

    /// The message the server attached to this failure, if any
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Unauthorized { message }
            | Self::Validation { message, .. }
            | Self::Server { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Structured server payload for validation failures
    pub fn payload(&self) -> Option<&Value> {
        match self {
            Self::Validation { payload, .. } => Some(payload),
            _ => None,
        }
    }

    /// Failures that may succeed if the same request is sent again
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Server { .. })
    }

    /// Whether the failure ended the user's session
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::NotAuthenticated => Some("Run: storefront login"),
            Self::SessionExpired => Some("Your session ended. Run: storefront login"),
            Self::Network { .. } => Some("Check api.base_url with: storefront config show"),
            Self::ConfigInvalid { .. } => Some("Reset with: storefront config init --force"),
            _ if self.is_retryable() => Some("The shop had a problem. Try again shortly"),
            _ => None,
        }
    }
}

/// Pull a human readable message out of an API error payload.
///
/// Looks at `error`, `detail` and `message` first, then at the first
/// field error of a validation map (`{"email": ["already registered"]}`).
pub fn extract_message(payload: &Value) -> Option<String> {
    match payload {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(map) => {
            for field in ["error", "detail", "message"] {
                if let Some(text) = map.get(field).and_then(first_text) {
                    return Some(text);
                }
            }
            map.iter()
                .find_map(|(field, value)| first_text(value).map(|t| format!("{}: {}", field, t)))
        }
        Value::Array(_) => first_text(payload),
        _ => None,
    }
}

fn first_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Array(items) => items.iter().find_map(first_text),
        _ => None,
    }
}
