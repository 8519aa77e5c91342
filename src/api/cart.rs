//! Shopping cart with optimistic quantity edits

use super::models::{Cart, CartItem};
use super::ApiContext;
use crate::error::StorefrontResult;
use crate::query::{InvalidatePolicy, MutateOptions, QueryKey};
use crate::transport::ApiRequest;
use serde_json::{json, Value};
use tracing::debug;

/// The signed-in user's cart
#[derive(Clone)]
pub struct CartApi {
    ctx: ApiContext,
}

fn recount(cart: &mut Value) {
    let total: u64 = cart["items"]
        .as_array()
        .map(|items| items.iter().filter_map(|i| i["quantity"].as_u64()).sum())
        .unwrap_or(0);
    if cart.is_object() {
        cart["total_items"] = json!(total);
    }
}

fn with_quantity(cart: &Value, item_id: u64, quantity: u32) -> Value {
    let mut cart = cart.clone();
    if let Some(items) = cart["items"].as_array_mut() {
        for item in items.iter_mut().filter(|i| i["id"] == item_id) {
            item["quantity"] = json!(quantity);
        }
    }
    recount(&mut cart);
    cart
}

fn without_item(cart: &Value, item_id: u64) -> Value {
    let mut cart = cart.clone();
    if let Some(items) = cart["items"].as_array_mut() {
        items.retain(|i| i["id"] != item_id);
    }
    recount(&mut cart);
    cart
}

fn emptied(cart: &Value) -> Value {
    let mut cart = cart.clone();
    if cart.is_object() {
        cart["items"] = json!([]);
        cart["total_items"] = json!(0);
        cart["total_amount"] = json!("0.00");
    }
    cart
}

impl CartApi {
    pub fn new(ctx: ApiContext) -> Self {
        Self { ctx }
    }

    pub async fn get(&self) -> StorefrontResult<Cart> {
        let request = ApiRequest::get("/api/cart/").authenticated();
        self.ctx
            .read(
                &QueryKey::cart(),
                self.ctx.fetch(request),
                Some(self.ctx.settings.cart_stale_time()),
            )
            .await
    }

    /// Add `quantity` units of a product; adds to an existing line
    pub async fn add(&self, product_id: u64, quantity: u32) -> StorefrontResult<CartItem> {
        let request = ApiRequest::post("/api/cart/add/")
            .authenticated()
            .json(&json!({"product_id": product_id, "quantity": quantity}))?;
        let transport = self.ctx.transport.clone();
        self.ctx
            .cache
            .mutate(
                &QueryKey::cart(),
                async move { transport.send_json::<CartItem>(request).await },
                MutateOptions::new().invalidate(InvalidatePolicy::OnSuccess),
            )
            .await
    }

    /// Change a line's quantity, shown immediately and rolled back if the
    /// server refuses. Zero removes the line.
    pub async fn set_quantity(&self, item_id: u64, quantity: u32) -> StorefrontResult<Option<CartItem>> {
        if quantity == 0 {
            debug!("Quantity 0 for cart item {}, removing", item_id);
            return self.remove(item_id).await.map(|()| None);
        }

        let request = ApiRequest::put(format!("/api/cart/items/{}/", item_id))
            .authenticated()
            .json(&json!({ "quantity": quantity }))?;
        let transport = self.ctx.transport.clone();
        self.ctx
            .cache
            .mutate(
                &QueryKey::cart(),
                async move { transport.send_json::<CartItem>(request).await },
                MutateOptions::new().optimistic(move |cart| with_quantity(cart, item_id, quantity)),
            )
            .await
            .map(Some)
    }

    /// Remove a line, hidden immediately and restored if the server refuses
    pub async fn remove(&self, item_id: u64) -> StorefrontResult<()> {
        let request =
            ApiRequest::delete(format!("/api/cart/items/{}/remove/", item_id)).authenticated();
        let transport = self.ctx.transport.clone();
        self.ctx
            .cache
            .mutate(
                &QueryKey::cart(),
                async move { transport.send(request).await.map(|_| ()) },
                MutateOptions::new().optimistic(move |cart| without_item(cart, item_id)),
            )
            .await
    }

    /// Empty the cart
    pub async fn clear(&self) -> StorefrontResult<()> {
        let request = ApiRequest::delete("/api/cart/clear/").authenticated();
        let transport = self.ctx.transport.clone();
        self.ctx
            .cache
            .mutate(
                &QueryKey::cart(),
                async move { transport.send(request).await.map(|_| ()) },
                MutateOptions::new().invalidate(InvalidatePolicy::Never),
            )
            .await?;
        self.ctx.cache.update_data(&QueryKey::cart(), emptied);
        Ok(())
    }
}
