//! Categories and products

use super::models::{Category, Product, ProductFilter};
use super::ApiContext;
use crate::error::StorefrontResult;
use crate::query::{fetcher, QueryKey};
use crate::transport::ApiRequest;
use serde_json::Value;
use std::time::Duration;

const CATEGORIES_STALE: Duration = Duration::from_secs(300);

/// Read-only catalog browsing; every endpoint is public
#[derive(Clone)]
pub struct CatalogApi {
    ctx: ApiContext,
}

impl CatalogApi {
    pub fn new(ctx: ApiContext) -> Self {
        Self { ctx }
    }

    pub async fn categories(&self) -> StorefrontResult<Vec<Category>> {
        let request = ApiRequest::get("/api/products/categories/").public();
        self.ctx
            .read(
                &QueryKey::categories(),
                self.ctx.fetch_listing(request),
                Some(CATEGORIES_STALE),
            )
            .await
    }

    fn by_category_request(slug: &str) -> ApiRequest {
        ApiRequest::get(format!("/api/products/categories/{}/products/", slug)).public()
    }

    fn by_category_key(slug: &str) -> QueryKey {
        QueryKey::products().with("category").with(slug)
    }

    pub async fn by_category(&self, slug: &str) -> StorefrontResult<Vec<Product>> {
        let request = Self::by_category_request(slug);
        self.ctx
            .read(&Self::by_category_key(slug), self.ctx.fetch_listing(request), None)
            .await
    }

    /// Filtered listing of active products
    pub async fn products(&self, filter: &ProductFilter) -> StorefrontResult<Vec<Product>> {
        let mut request = ApiRequest::get("/api/products/").public();
        if let Some(ref term) = filter.search {
            request = request.query("search", term);
        }
        if let Some(ref category) = filter.category {
            request = request.query("category", category);
        }
        if filter.featured {
            request = request.query("is_featured", "true");
        }

        let key = QueryKey::products().with("list").with(filter.cache_segment());
        self.ctx.read(&key, self.ctx.fetch_listing(request), None).await
    }

    pub async fn featured(&self) -> StorefrontResult<Vec<Product>> {
        let request = ApiRequest::get("/api/products/featured/").public();
        self.ctx
            .read(
                &QueryKey::products().with("featured"),
                self.ctx.fetch_listing(request),
                None,
            )
            .await
    }

    /// Products currently sold at a discount
    pub async fn offers(&self) -> StorefrontResult<Vec<Product>> {
        let all = self.ctx.fetch_listing(ApiRequest::get("/api/products/").public());
        let discounted = fetcher(move || {
            let all = all.clone();
            async move {
                let products = all().await?;
                let offers: Vec<Value> = products
                    .as_array()
                    .map(|items| {
                        items
                            .iter()
                            .filter(|p| p["has_discount"].as_bool().unwrap_or(false))
                            .cloned()
                            .collect()
                    })
                    .unwrap_or_default();
                Ok(Value::Array(offers))
            }
        });
        self.ctx
            .read(&QueryKey::products().with("offers"), discounted, None)
            .await
    }

    fn product_request(slug: &str) -> ApiRequest {
        ApiRequest::get(format!("/api/products/{}/", slug)).public()
    }

    pub async fn product(&self, slug: &str) -> StorefrontResult<Product> {
        self.ctx
            .read(
                &QueryKey::product(slug),
                self.ctx.fetch(Self::product_request(slug)),
                None,
            )
            .await
    }

    pub async fn recommended(&self, product_id: u64) -> StorefrontResult<Vec<Product>> {
        let request =
            ApiRequest::get(format!("/api/products/{}/recommended/", product_id)).public();
        self.ctx
            .read(
                &QueryKey::recommended(product_id),
                self.ctx.fetch_listing(request),
                Some(self.ctx.settings.recommended_stale_time()),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing;
    use crate::transport::{Method, ScriptedBackend};
    use serde_json::json;
    use std::sync::Arc;

    fn product(id: u64, slug: &str, discounted: bool) -> Value {
        json!({"id": id, "name": slug, "slug": slug, "price": "10.00", "has_discount": discounted})
    }

    #[tokio::test]
    async fn categories_are_cached_and_public() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.respond(
            Method::Get,
            "/api/products/categories/",
            200,
            json!({"count": 1, "results": [{"id": 1, "name": "Hats", "slug": "hats"}]}),
        );
        let catalog = CatalogApi::new(testing::context(backend.clone()));

        let first = catalog.categories().await.unwrap();
        let second = catalog.categories().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first[0].slug, "hats");
        let calls = backend.calls(Method::Get, "/api/products/categories/");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].header("Authorization"), None);
    }

    #[tokio::test]
    async fn search_sends_query_parameters() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.respond(Method::Get, "/api/products/", 200, json!([product(1, "wool-hat", false)]));
        let catalog = CatalogApi::new(testing::context(backend.clone()));

        let filter = ProductFilter {
            search: Some("wool hat".into()),
            featured: true,
            ..ProductFilter::default()
        };
        let found = catalog.products(&filter).await.unwrap();

        assert_eq!(found.len(), 1);
        let url = &backend.calls(Method::Get, "/api/products/")[0].url;
        assert!(url.contains("search=wool%20hat"), "{}", url);
        assert!(url.contains("is_featured=true"), "{}", url);
    }

    #[tokio::test]
    async fn offers_keep_discounted_products() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.respond(
            Method::Get,
            "/api/products/",
            200,
            json!([product(1, "a", true), product(2, "b", false), product(3, "c", true)]),
        );
        let catalog = CatalogApi::new(testing::context(backend));

        let offers = catalog.offers().await.unwrap();
        let ids: Vec<u64> = offers.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn category_listing_is_cached_per_slug() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.respond(
            Method::Get,
            "/api/products/categories/hats/products/",
            200,
            json!([product(5, "cap", false)]),
        );
        let ctx = testing::context(backend.clone());
        let catalog = CatalogApi::new(ctx.clone());

        let hats = catalog.by_category("hats").await.unwrap();

        assert_eq!(hats[0].slug, "cap");
        let key = QueryKey::products().with("category").with("hats");
        assert!(ctx.cache().get_data(&key).is_some());
        assert_eq!(
            backend
                .calls(Method::Get, "/api/products/categories/hats/products/")
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn featured_uses_dedicated_endpoint() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.respond(
            Method::Get,
            "/api/products/featured/",
            200,
            json!([product(8, "beret", false)]),
        );
        let catalog = CatalogApi::new(testing::context(backend.clone()));

        let featured = catalog.featured().await.unwrap();

        assert_eq!(featured[0].id, 8);
        assert!(backend.calls(Method::Get, "/api/products/").is_empty());
    }

    #[tokio::test]
    async fn missing_product_is_validation_error() {
        let backend = Arc::new(ScriptedBackend::new());
        let catalog = CatalogApi::new(testing::context(backend));

        let err = catalog.product("nope").await.unwrap_err();
        assert_eq!(err.server_message(), Some("Not found."));
    }
}
