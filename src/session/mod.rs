//! Session credential storage

pub mod credentials;
pub mod store;

pub use credentials::{CredentialPair, RefreshRequest, RefreshResponse, TokenResponse};
pub use store::{FileSessionStore, MemorySessionStore, SessionStore};
