//! Credential storage
//!
//! Store operations are synchronous so a credential change and the matching
//! cache clear happen with no suspension point between them.

use super::credentials::{CredentialPair, PersistedSession};
use crate::error::{StorefrontError, StorefrontResult};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Holder of the current credential pair
pub trait SessionStore: Send + Sync {
    /// Current credential pair, if a user is logged in
    fn get(&self) -> Option<CredentialPair>;

    /// Replace the stored pair
    fn set(&self, pair: CredentialPair) -> StorefrontResult<()>;

    /// Forget the stored pair
    fn clear(&self) -> StorefrontResult<()>;

    /// Store `pair` only if the current access token is still `previous_access`.
    ///
    /// Returns false (and stores nothing) when the session was cleared or
    /// replaced in the meantime.
    fn rotate(&self, previous_access: &str, pair: CredentialPair) -> StorefrontResult<bool>;

    /// Whether a credential pair is present
    fn is_present(&self) -> bool {
        self.get().is_some()
    }
}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Process-local store, nothing survives a restart
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    current: Mutex<Option<CredentialPair>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an existing session
    pub fn with_pair(pair: CredentialPair) -> Self {
        Self {
            current: Mutex::new(Some(pair)),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self) -> Option<CredentialPair> {
        guard(&self.current).clone()
    }

    fn set(&self, pair: CredentialPair) -> StorefrontResult<()> {
        *guard(&self.current) = Some(pair);
        Ok(())
    }

    fn clear(&self) -> StorefrontResult<()> {
        *guard(&self.current) = None;
        Ok(())
    }

    fn rotate(&self, previous_access: &str, pair: CredentialPair) -> StorefrontResult<bool> {
        let mut current = guard(&self.current);
        match current.as_ref() {
            Some(existing) if existing.access() == previous_access => {
                *current = Some(pair);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// File-backed store scoped to one API origin.
///
/// Layout: `{"token": "...", "refresh": "..."}` in
/// `<dir>/<sha256(origin) prefix>.json`, mode 0600 on unix.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    current: Mutex<Option<CredentialPair>>,
}

impl FileSessionStore {
    /// Open (or create) the session file for `base_url`'s origin in `dir`
    pub async fn open(dir: &Path, base_url: &str) -> StorefrontResult<Self> {
        let path = Self::session_path(dir, base_url)?;

        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| StorefrontError::io(format!("creating {}", dir.display()), e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o700);
            std::fs::set_permissions(dir, perms)
                .map_err(|e| StorefrontError::io("setting sessions dir permissions", e))?;
        }

        let current = if path.exists() {
            let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
                StorefrontError::io(format!("reading session file {}", path.display()), e)
            })?;
            let persisted: PersistedSession = serde_json::from_str(&content)?;
            persisted.into_pair()
        } else {
            None
        };

        debug!(
            "Opened session store {} (logged in: {})",
            path.display(),
            current.is_some()
        );

        Ok(Self {
            path,
            current: Mutex::new(current),
        })
    }

    /// Path of the session file for an API base URL
    pub fn session_path(dir: &Path, base_url: &str) -> StorefrontResult<PathBuf> {
        let origin = origin_of(base_url)?;
        let digest = hex::encode(Sha256::digest(origin.as_bytes()));
        Ok(dir.join(format!("{}.json", &digest[..16])))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, pair: Option<&CredentialPair>) -> StorefrontResult<()> {
        let Some(pair) = pair else {
            if self.path.exists() {
                fs::remove_file(&self.path)
                    .map_err(|e| StorefrontError::SessionPersist(e.to_string()))?;
            }
            return Ok(());
        };

        let content = serde_json::to_string(&PersistedSession::from(pair))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).map_err(|e| StorefrontError::SessionPersist(e.to_string()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            fs::set_permissions(&tmp, perms)
                .map_err(|e| StorefrontError::SessionPersist(e.to_string()))?;
        }

        fs::rename(&tmp, &self.path).map_err(|e| StorefrontError::SessionPersist(e.to_string()))
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self) -> Option<CredentialPair> {
        guard(&self.current).clone()
    }

    fn set(&self, pair: CredentialPair) -> StorefrontResult<()> {
        let mut current = guard(&self.current);
        *current = Some(pair);
        self.persist(current.as_ref())
    }

    fn clear(&self) -> StorefrontResult<()> {
        let mut current = guard(&self.current);
        *current = None;
        self.persist(None)
    }

    fn rotate(&self, previous_access: &str, pair: CredentialPair) -> StorefrontResult<bool> {
        let mut current = guard(&self.current);
        match current.as_ref() {
            Some(existing) if existing.access() == previous_access => {
                *current = Some(pair);
                self.persist(current.as_ref())?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// `scheme://host[:port]`, lowercased, of a base URL
pub fn origin_of(base_url: &str) -> StorefrontResult<String> {
    let trimmed = base_url.trim();
    let (scheme, rest) = trimmed
        .split_once("://")
        .ok_or_else(|| StorefrontError::InvalidBaseUrl(trimmed.to_string()))?;
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if scheme.is_empty() || authority.is_empty() {
        return Err(StorefrontError::InvalidBaseUrl(trimmed.to_string()));
    }
    Ok(format!(
        "{}://{}",
        scheme.to_ascii_lowercase(),
        authority.to_ascii_lowercase()
    ))
}
