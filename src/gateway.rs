//! Gateway assembly
//!
//! Builds one session store, transport, query cache and auth controller and
//! wires the transport's expiry hook to the cache and auth state.

use crate::api::{ApiContext, CartApi, CatalogApi, ProfileApi, PurchasesApi, SellerApi};
use crate::audit::AuditLog;
use crate::auth::{AuthController, AuthStateHandle};
use crate::config::schema::Config;
use crate::config::ConfigManager;
use crate::error::StorefrontResult;
use crate::query::QueryCache;
use crate::session::store::origin_of;
use crate::session::{FileSessionStore, MemorySessionStore, SessionStore};
use crate::transport::{HttpBackend, Transport, UreqBackend};
use std::sync::Arc;
use tracing::debug;

/// Owner of every gateway component for one API origin
pub struct Gateway {
    config: Config,
    session: Arc<dyn SessionStore>,
    api: ApiContext,
    auth: AuthController,
    audit: AuditLog,
}

impl Gateway {
    /// Gateway over the network, with the session persisted to disk unless
    /// `session.persist` is off
    pub async fn connect(config: &Config) -> StorefrontResult<Self> {
        let session: Arc<dyn SessionStore> = if config.session.persist {
            let dir = ConfigManager::sessions_dir(config);
            Arc::new(FileSessionStore::open(&dir, &config.api.base_url).await?)
        } else {
            Arc::new(MemorySessionStore::new())
        };
        let backend = Arc::new(UreqBackend::from_config(&config.api));
        Self::with_parts(config, backend, session)
    }

    /// Gateway over explicit backend and session store
    pub fn with_parts(
        config: &Config,
        backend: Arc<dyn HttpBackend>,
        session: Arc<dyn SessionStore>,
    ) -> StorefrontResult<Self> {
        let origin = origin_of(&config.api.base_url)?;
        let audit = AuditLog::new(config);
        let cache = QueryCache::new(config.cache.stale_time());
        let state = AuthStateHandle::default();

        let hook = AuthController::expiry_hook(cache.clone(), state.clone(), audit.clone(), origin);
        let transport = Transport::new(config.api.clone(), backend, session.clone())?
            .on_session_expired(hook);

        let api = ApiContext::new(Arc::new(transport), cache, config.cache.clone());
        let auth = AuthController::new(api.clone(), state, audit.clone());
        debug!("Gateway ready for {}", api.transport.base_url());

        Ok(Self {
            config: config.clone(),
            session,
            api,
            auth,
            audit,
        })
    }

    /// Finish background work that must outlive the current command, such
    /// as the audit entry for an expired session
    pub async fn shutdown(&self) {
        self.audit.flush().await;
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &Arc<dyn SessionStore> {
        &self.session
    }

    pub fn cache(&self) -> &QueryCache {
        &self.api.cache
    }

    pub fn transport(&self) -> &Arc<Transport> {
        &self.api.transport
    }

    pub fn auth(&self) -> &AuthController {
        &self.auth
    }

    pub fn catalog(&self) -> CatalogApi {
        CatalogApi::new(self.api.clone())
    }

    pub fn cart(&self) -> CartApi {
        CartApi::new(self.api.clone())
    }

    pub fn purchases(&self) -> PurchasesApi {
        PurchasesApi::new(self.api.clone())
    }

    pub fn seller(&self) -> SellerApi {
        SellerApi::new(self.api.clone())
    }

    pub fn profile(&self) -> ProfileApi {
        ProfileApi::new(self.api.clone())
    }
}
