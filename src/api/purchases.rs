//! Checkout and order history

use super::models::{Cart, NewPurchase, PaymentIntent, PaymentMethod, Purchase};
use super::ApiContext;
use crate::error::{StorefrontError, StorefrontResult};
use crate::query::{InvalidatePolicy, MutateOptions, QueryKey, ReadOptions};
use crate::transport::ApiRequest;
use serde_json::json;
use std::time::Duration;
use tracing::info;

const HISTORY_STALE: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct PurchasesApi {
    ctx: ApiContext,
}

impl PurchasesApi {
    pub fn new(ctx: ApiContext) -> Self {
        Self { ctx }
    }

    fn history_request() -> ApiRequest {
        ApiRequest::get("/api/purchases/history/").authenticated()
    }

    pub async fn history(&self) -> StorefrontResult<Vec<Purchase>> {
        self.ctx
            .read(
                &QueryKey::purchase_history(),
                self.ctx.fetch_listing(Self::history_request()),
                Some(HISTORY_STALE),
            )
            .await
    }

    /// A single order, as shown on its receipt
    pub async fn get(&self, id: u64) -> StorefrontResult<Purchase> {
        let request = ApiRequest::get(format!("/api/purchases/{}/", id)).authenticated();
        self.ctx
            .read(&QueryKey::purchase(id), self.ctx.fetch(request), None)
            .await
    }

    /// Ask the server for a payment intent covering `total_amount`
    pub async fn create_payment_intent(&self, total_amount: &str) -> StorefrontResult<PaymentIntent> {
        let request = ApiRequest::post("/api/purchases/create-payment-intent/")
            .authenticated()
            .json(&json!({ "total_amount": total_amount }))?;
        self.ctx.transport.send_json(request).await
    }

    /// Record a purchase whose payment already succeeded
    pub async fn create(&self, purchase: &NewPurchase) -> StorefrontResult<Purchase> {
        if purchase.items.is_empty() {
            return Err(StorefrontError::User("Nothing to purchase".to_string()));
        }

        let request = ApiRequest::post("/api/purchases/create/")
            .authenticated()
            .json(purchase)?;
        let transport = self.ctx.transport.clone();
        let created = self
            .ctx
            .cache
            .mutate(
                &QueryKey::purchase_history(),
                async move { transport.send_json::<Purchase>(request).await },
                MutateOptions::new()
                    .invalidate(InvalidatePolicy::OnSuccess)
                    .also_invalidate(QueryKey::cart()),
            )
            .await?;

        info!("Purchase {} recorded", created.id);
        self.ctx.cache.prefetch(
            QueryKey::purchase_history(),
            self.ctx.fetch_listing(Self::history_request()),
            ReadOptions::stale_time(HISTORY_STALE),
        );
        Ok(created)
    }

    /// Record a purchase of everything in `cart`
    pub async fn checkout(
        &self,
        cart: &Cart,
        payment_intent_id: &str,
        method: PaymentMethod,
    ) -> StorefrontResult<Purchase> {
        self.create(&NewPurchase::from_cart(cart, payment_intent_id, method))
            .await
    }
}
