//! Storefront resource models
//!
//! Monetary amounts are decimal strings (`"19.99"`) as the API sends them;
//! numeric amounts are accepted and normalised to two decimals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

fn amount_from(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => n.as_f64().map(|f| format!("{:.2}", f)),
        _ => None,
    }
}

fn de_amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(amount_from(value).unwrap_or_else(|| "0.00".to_string()))
}

fn de_opt_amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(amount_from))
}

fn zero_amount() -> String {
    "0.00".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: u64,
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub date_joined: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// Full name when known, else the username, else the email
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if !full.is_empty() {
            full.to_string()
        } else if !self.username.is_empty() {
            self.username.clone()
        } else {
            self.email.clone()
        }
    }
}

/// Partial profile update; unset fields are left untouched
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.first_name.is_none() && self.last_name.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: u64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub products_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: u64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(deserialize_with = "de_amount")]
    pub price: String,
    #[serde(default, deserialize_with = "de_opt_amount")]
    pub discount_price: Option<String>,
    #[serde(default, deserialize_with = "de_opt_amount")]
    pub final_price: Option<String>,
    #[serde(default)]
    pub has_discount: bool,
    #[serde(default)]
    pub discount_percentage: u32,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_available: bool,
}

impl Product {
    /// Price a buyer pays: the server's final price, else the discount, else list
    pub fn effective_price(&self) -> &str {
        self.final_price
            .as_deref()
            .or(self.discount_price.as_deref())
            .unwrap_or(&self.price)
    }
}

/// Listing filter for `GET /api/products/`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    pub featured: bool,
}

impl ProductFilter {
    pub fn search(term: impl Into<String>) -> Self {
        Self {
            search: Some(term.into()),
            ..Self::default()
        }
    }

    /// Stable cache segment describing the filter
    pub fn cache_segment(&self) -> String {
        format!(
            "search={}&category={}&featured={}",
            self.search.as_deref().unwrap_or(""),
            self.category.as_deref().unwrap_or(""),
            self.featured
        )
    }
}

/// New listing submitted by a seller
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub price: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_price: Option<String>,
    pub stock: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub is_featured: bool,
}

/// Partial edit of an existing listing
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProductUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_featured: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl ProductUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.discount_price.is_none()
            && self.stock.is_none()
            && self.category_id.is_none()
            && self.image_url.is_none()
            && self.is_featured.is_none()
            && self.is_active.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: u64,
    pub product: Product,
    pub quantity: u32,
    #[serde(default, deserialize_with = "de_opt_amount")]
    pub subtotal: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    #[serde(default)]
    pub items: Vec<CartItem>,
    #[serde(default)]
    pub total_items: u32,
    #[serde(default = "zero_amount", deserialize_with = "de_amount")]
    pub total_amount: String,
}

impl Cart {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item(&self, item_id: u64) -> Option<&CartItem> {
        self.items.iter().find(|i| i.id == item_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseItem {
    #[serde(default)]
    pub id: Option<u64>,
    pub product_name: String,
    pub quantity: u32,
    #[serde(deserialize_with = "de_amount")]
    pub price: String,
    #[serde(default, deserialize_with = "de_opt_amount")]
    pub subtotal: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: u64,
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(deserialize_with = "de_amount")]
    pub total_amount: String,
    #[serde(default)]
    pub stripe_payment_intent_id: Option<String>,
    #[serde(default)]
    pub payment_method: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub items: Vec<PurchaseItem>,
}

/// Payment intent handed to the external payment step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntent {
    #[serde(rename = "clientSecret")]
    pub client_secret: String,
    #[serde(rename = "paymentIntentId")]
    pub payment_intent_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    GooglePay,
    ApplePay,
    Paypal,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 4] = [
        PaymentMethod::Card,
        PaymentMethod::GooglePay,
        PaymentMethod::ApplePay,
        PaymentMethod::Paypal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::GooglePay => "google_pay",
            PaymentMethod::ApplePay => "apple_pay",
            PaymentMethod::Paypal => "paypal",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == normalized)
            .ok_or_else(|| {
                format!(
                    "unknown payment method '{}' (expected one of: card, google_pay, apple_pay, paypal)",
                    s
                )
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewPurchaseItem {
    pub product_name: String,
    pub quantity: u32,
    pub price: String,
}

/// Purchase record sent after the external payment step succeeded
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewPurchase {
    pub total_amount: String,
    pub stripe_payment_intent_id: String,
    pub payment_method: PaymentMethod,
    pub items: Vec<NewPurchaseItem>,
}

impl NewPurchase {
    /// Build the purchase record for everything currently in `cart`
    pub fn from_cart(cart: &Cart, payment_intent_id: &str, method: PaymentMethod) -> Self {
        Self {
            total_amount: cart.total_amount.clone(),
            stripe_payment_intent_id: payment_intent_id.to_string(),
            payment_method: method,
            items: cart
                .items
                .iter()
                .map(|item| NewPurchaseItem {
                    product_name: item.product.name.clone(),
                    quantity: item.quantity,
                    price: item.product.effective_price().to_string(),
                })
                .collect(),
        }
    }
}
