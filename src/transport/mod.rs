//! HTTP transport
//!
//! `Transport` resolves API paths against the configured base URL, attaches
//! the session's bearer credential and performs the single refresh-and-retry
//! cycle on authorization failures. Network I/O goes through an
//! [`HttpBackend`].

pub mod backend;
pub mod client;
pub mod request;
pub mod scripted;

pub use backend::{HttpBackend, HttpRequest, HttpResponse, UreqBackend};
pub use client::{ExpiryHook, Transport};
pub use request::{ApiRequest, ApiResponse, AuthMode, Method};
pub use scripted::ScriptedBackend;
