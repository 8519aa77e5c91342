//! Cache keys

use serde::Serialize;
use std::fmt;

/// Stable identifier of a server resource: resource name plus parameters
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    /// Key made of a single resource name
    pub fn new(resource: impl Into<String>) -> Self {
        Self(vec![resource.into()])
    }

    /// Append a parameter segment
    pub fn with(mut self, segment: impl ToString) -> Self {
        self.0.push(segment.to_string());
        self
    }

    /// Prefix match used by invalidation: `["products"]` matches
    /// `["products", "category", "shoes"]`.
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }

    pub fn current_user() -> Self {
        Self::new("currentUser")
    }

    pub fn cart() -> Self {
        Self::new("cart")
    }

    pub fn categories() -> Self {
        Self::new("categories")
    }

    pub fn products() -> Self {
        Self::new("products")
    }

    pub fn product(slug: &str) -> Self {
        Self::new("product").with(slug)
    }

    pub fn recommended(product_id: u64) -> Self {
        Self::new("recommended").with(product_id)
    }

    pub fn purchase_history() -> Self {
        Self::new("purchaseHistory")
    }

    pub fn purchase(id: u64) -> Self {
        Self::new("purchase").with(id)
    }

    pub fn my_products() -> Self {
        Self::new("myProducts")
    }

    pub fn my_product(id: u64) -> Self {
        Self::new("myProduct").with(id)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_matching() {
        let by_category = QueryKey::products().with("category").with("shoes");
        assert!(by_category.starts_with(&QueryKey::products()));
        assert!(by_category.starts_with(&by_category));
        assert!(!QueryKey::products().starts_with(&by_category));
        assert!(!QueryKey::product("shoes").starts_with(&QueryKey::products()));
    }

    #[test]
    fn display_joins_segments() {
        assert_eq!(QueryKey::purchase(42).to_string(), "purchase/42");
        assert_eq!(QueryKey::cart().to_string(), "cart");
    }
}
