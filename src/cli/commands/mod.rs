//! CLI command implementations

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod completions;
pub mod config;
pub mod orders;
pub mod profile;
pub mod seller;
pub mod status;

pub use auth::{login, logout, register, whoami};
pub use cart::execute as cart;
pub use catalog::{categories, product, products};
pub use completions::execute as completions;
pub use config::execute as config;
pub use orders::{checkout, orders, receipt};
pub use profile::execute as profile;
pub use seller::{edit_product, my_products, sell};
pub use status::execute as status;

use crate::api::models::UserProfile;
use crate::auth::AuthState;
use crate::error::{StorefrontError, StorefrontResult};
use crate::gateway::Gateway;

/// Resume the stored session or fail with a sign-in hint
pub(crate) async fn signed_in(gateway: &Gateway) -> StorefrontResult<UserProfile> {
    match gateway.auth().restore().await? {
        Some(user) => Ok(user),
        None if gateway.auth().state() == AuthState::SessionExpired => {
            Err(StorefrontError::SessionExpired)
        }
        None => Err(StorefrontError::NotAuthenticated),
    }
}

/// Money as the API sends it, prefixed for display
pub(crate) fn money(amount: &str) -> String {
    format!("${}", amount)
}
