//! Storefront - authenticated storefront API gateway
//!
//! A client for a storefront REST API: bearer-token transport with one-shot
//! token renewal, a persisted session, and a stale-while-revalidate query
//! cache with optimistic mutations.

pub mod api;
pub mod audit;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod query;
pub mod session;
pub mod transport;
pub mod ui;

pub use error::{StorefrontError, StorefrontResult};
pub use gateway::Gateway;
