//! Typed storefront resources
//!
//! Each resource pairs transport calls with cache reads and mutations under
//! the keys in [`QueryKey`]. Obtain them from [`crate::gateway::Gateway`].

pub mod cart;
pub mod catalog;
pub mod models;
pub mod profile;
pub mod purchases;
pub mod seller;

pub use cart::CartApi;
pub use catalog::CatalogApi;
pub use profile::ProfileApi;
pub use purchases::PurchasesApi;
pub use seller::SellerApi;

use crate::config::schema::CacheConfig;
use crate::error::StorefrontResult;
use crate::query::{fetcher, Fetcher, QueryCache, QueryKey, ReadOptions};
use crate::transport::{ApiRequest, ApiResponse, Transport};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Handles shared by every resource
#[derive(Clone)]
pub struct ApiContext {
    pub(crate) transport: Arc<Transport>,
    pub(crate) cache: QueryCache,
    pub(crate) settings: CacheConfig,
}

impl ApiContext {
    pub fn new(transport: Arc<Transport>, cache: QueryCache, settings: CacheConfig) -> Self {
        Self {
            transport,
            cache,
            settings,
        }
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Fetcher issuing `request` and yielding the decoded body
    pub(crate) fn fetch(&self, request: ApiRequest) -> Fetcher {
        let transport = self.transport.clone();
        fetcher(move || {
            let transport = transport.clone();
            let request = request.clone();
            async move { transport.send(request).await.map(ApiResponse::into_body) }
        })
    }

    /// Fetcher for list endpoints that may answer paginated or plain
    pub(crate) fn fetch_listing(&self, request: ApiRequest) -> Fetcher {
        let inner = self.fetch(request);
        fetcher(move || {
            let inner = inner.clone();
            async move { inner().await.map(listing) }
        })
    }

    /// Cached read deserialized to `T`
    pub(crate) async fn read<T: DeserializeOwned>(
        &self,
        key: &QueryKey,
        fetcher: Fetcher,
        stale_time: Option<Duration>,
    ) -> StorefrontResult<T> {
        let options = ReadOptions {
            stale_time,
            force: false,
        };
        self.cache.read_as(key, fetcher, options).await
    }
}

/// Unwrap `{"results": [...]}` pages to the bare array
pub(crate) fn listing(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.get("results").is_some_and(Value::is_array) => {
            map.remove("results").unwrap_or(Value::Null)
        }
        other => other,
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::session::{CredentialPair, MemorySessionStore, SessionStore};
    use crate::transport::ScriptedBackend;
    use crate::config::schema::ApiConfig;

    pub const BASE_URL: &str = "http://shop.test";

    /// Context over a scripted backend with a signed-in memory session
    pub fn context(backend: Arc<ScriptedBackend>) -> ApiContext {
        let session: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::with_pair(
            CredentialPair::new("a1", "r1"),
        ));
        let api = ApiConfig {
            base_url: BASE_URL.to_string(),
            ..ApiConfig::default()
        };
        let transport = Transport::new(api, backend, session).unwrap();
        ApiContext::new(
            Arc::new(transport),
            QueryCache::new(Duration::ZERO),
            CacheConfig::default(),
        )
    }
}
