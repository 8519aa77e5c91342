//! Seller self-listing

use super::models::{NewProduct, Product, ProductUpdate};
use super::ApiContext;
use crate::error::{StorefrontError, StorefrontResult};
use crate::query::{InvalidatePolicy, MutateOptions, QueryKey};
use crate::transport::ApiRequest;

/// Products listed by the signed-in user
#[derive(Clone)]
pub struct SellerApi {
    ctx: ApiContext,
}

impl SellerApi {
    pub fn new(ctx: ApiContext) -> Self {
        Self { ctx }
    }

    pub async fn my_products(&self) -> StorefrontResult<Vec<Product>> {
        let request = ApiRequest::get("/api/products/my-products/").authenticated();
        self.ctx
            .read(&QueryKey::my_products(), self.ctx.fetch_listing(request), None)
            .await
    }

    pub async fn my_product(&self, id: u64) -> StorefrontResult<Product> {
        let request = ApiRequest::get(format!("/api/products/my-products/{}/", id)).authenticated();
        self.ctx
            .read(&QueryKey::my_product(id), self.ctx.fetch(request), None)
            .await
    }

    /// Submit a new listing. It may need review before it is published.
    pub async fn create(&self, product: &NewProduct) -> StorefrontResult<Product> {
        let request = ApiRequest::post("/api/products/")
            .authenticated()
            .json(product)?;
        let transport = self.ctx.transport.clone();
        self.ctx
            .cache
            .mutate(
                &QueryKey::products(),
                async move { transport.send_json::<Product>(request).await },
                MutateOptions::new()
                    .invalidate(InvalidatePolicy::OnSuccess)
                    .also_invalidate(QueryKey::my_products()),
            )
            .await
    }

    /// Apply a partial edit to one of the user's listings
    pub async fn update(&self, id: u64, changes: &ProductUpdate) -> StorefrontResult<Product> {
        if changes.is_empty() {
            return Err(StorefrontError::User("No changes to save".to_string()));
        }

        let request = ApiRequest::patch(format!("/api/products/my-products/{}/", id))
            .authenticated()
            .json(changes)?;
        let transport = self.ctx.transport.clone();
        self.ctx
            .cache
            .mutate(
                &QueryKey::my_product(id),
                async move { transport.send_json::<Product>(request).await },
                MutateOptions::new()
                    .invalidate(InvalidatePolicy::OnSuccess)
                    .also_invalidate(QueryKey::my_products())
                    .also_invalidate(QueryKey::products()),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing;
    use crate::query::EntryStatus;
    use crate::transport::{Method, ScriptedBackend};
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn listing(id: u64, stock: u32) -> Value {
        json!({"id": id, "name": "Scarf", "slug": "scarf", "price": "15.00", "stock": stock})
    }

    #[tokio::test]
    async fn update_invalidates_seller_and_catalog_views() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.respond(Method::Patch, "/api/products/my-products/4/", 200, listing(4, 0));
        let ctx = testing::context(backend.clone());
        ctx.cache().set_data(&QueryKey::my_products(), json!([listing(4, 3)]));
        ctx.cache().set_data(&QueryKey::products().with("offers"), json!([]));
        let seller = SellerApi::new(ctx.clone());

        let changes = ProductUpdate {
            stock: Some(0),
            ..ProductUpdate::default()
        };
        let updated = seller.update(4, &changes).await.unwrap();

        assert_eq!(updated.stock, 0);
        for key in [QueryKey::my_products(), QueryKey::products().with("offers")] {
            assert_eq!(ctx.cache().entry(&key).unwrap().status, EntryStatus::Stale);
        }
        let sent = backend.calls(Method::Patch, "/api/products/my-products/4/");
        assert_eq!(sent[0].json_body().unwrap(), json!({"stock": 0}));
    }

    #[tokio::test]
    async fn empty_update_is_rejected_locally() {
        let backend = Arc::new(ScriptedBackend::new());
        let seller = SellerApi::new(testing::context(backend.clone()));

        assert!(seller.update(4, &ProductUpdate::default()).await.is_err());
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn create_reports_field_errors() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.respond(
            Method::Post,
            "/api/products/",
            400,
            json!({"price": ["A valid number is required."]}),
        );
        let seller = SellerApi::new(testing::context(backend));

        let err = seller
            .create(&NewProduct {
                name: "Scarf".into(),
                price: "abc".into(),
                ..NewProduct::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "price: A valid number is required.");
        assert_eq!(err.payload().unwrap()["price"][0], "A valid number is required.");
    }
}
