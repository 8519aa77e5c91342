//! Credential pair and its wire/persisted representations

use serde::{Deserialize, Serialize};
use std::fmt;

/// Bearer credential plus the longer-lived token used to mint new ones.
///
/// Both tokens are opaque. A pair restored from storage may lack a refresh
/// token; such a session works until the access token is rejected.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialPair {
    access: String,
    refresh: Option<String>,
}

impl CredentialPair {
    /// Create a pair from freshly issued tokens
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: Some(refresh.into()),
        }
    }

    /// Create a pair that cannot be refreshed
    pub fn access_only(access: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: None,
        }
    }

    pub fn access(&self) -> &str {
        &self.access
    }

    pub fn refresh(&self) -> Option<&str> {
        self.refresh.as_deref()
    }

    /// Replace the access token, keeping the refresh token unless the server
    /// rotated it.
    pub fn renewed(&self, access: String, rotated_refresh: Option<String>) -> Self {
        Self {
            access,
            refresh: rotated_refresh.or_else(|| self.refresh.clone()),
        }
    }

    /// Value for the `Authorization` header
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access)
    }
}

// Tokens never show up in logs
impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access", &"<redacted>")
            .field("refresh", &self.refresh.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Persisted layout: two string values under fixed keys.
///
/// A missing `token` means logged out, whatever else the file holds.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct PersistedSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<String>,
}

impl PersistedSession {
    pub fn into_pair(self) -> Option<CredentialPair> {
        let access = self.token.filter(|t| !t.is_empty())?;
        Some(CredentialPair {
            access,
            refresh: self.refresh.filter(|t| !t.is_empty()),
        })
    }
}

impl From<&CredentialPair> for PersistedSession {
    fn from(pair: &CredentialPair) -> Self {
        Self {
            token: Some(pair.access.clone()),
            refresh: pair.refresh.clone(),
        }
    }
}

/// Token pair as returned by the login and register endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access: String,
    pub refresh: String,
}

impl From<TokenResponse> for CredentialPair {
    fn from(tokens: TokenResponse) -> Self {
        CredentialPair::new(tokens.access, tokens.refresh)
    }
}

/// Body sent to the token refresh endpoint
#[derive(Debug, Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

/// Token refresh response; `refresh` is present when the server rotates
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}
