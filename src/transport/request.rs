//! API request and response types

use crate::error::{StorefrontError, StorefrontResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// HTTP methods used by the storefront API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a request relates to the user's session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    /// Never carries a bearer credential and never triggers a refresh
    Public,
    /// Carries the bearer credential when a session exists
    #[default]
    Optional,
    /// Fails with `NotAuthenticated` before any I/O when no session exists
    Required,
}

/// A request against the storefront API, relative to the base URL
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub auth: AuthMode,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            auth: AuthMode::default(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::Patch, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Mark as an unauthenticated endpoint
    pub fn public(mut self) -> Self {
        self.auth = AuthMode::Public;
        self
    }

    /// Require a logged-in session
    pub fn authenticated(mut self) -> Self {
        self.auth = AuthMode::Required;
        self
    }

    /// Attach a JSON body
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> StorefrontResult<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Append a query parameter; empty values are skipped
    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        let value = value.to_string();
        if !value.is_empty() {
            self.query.push((key.to_string(), value));
        }
        self
    }

    /// Path plus encoded query string
    pub fn path_and_query(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query = self
            .query
            .iter()
            .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", self.path, query)
    }
}

/// Decoded API response
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub path: String,
    pub body: Value,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx response into the matching error
    pub fn error_for_status(self) -> StorefrontResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(StorefrontError::from_status(self.status, self.body))
        }
    }

    /// Deserialize the body
    pub fn json<T: DeserializeOwned>(self) -> StorefrontResult<T> {
        serde_json::from_value(self.body).map_err(|e| StorefrontError::MalformedResponse {
            path: self.path,
            status: self.status,
            reason: e.to_string(),
        })
    }

    pub fn into_body(self) -> Value {
        self.body
    }
}

/// Percent-encode a query component (RFC 3986 unreserved set kept)
fn encode_component(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_defaults_to_optional_auth() {
        let request = ApiRequest::get("/api/products/");
        assert_eq!(request.auth, AuthMode::Optional);
        assert!(request.body.is_none());

        assert_eq!(ApiRequest::post("/x").public().auth, AuthMode::Public);
        assert_eq!(ApiRequest::get("/x").authenticated().auth, AuthMode::Required);
    }

    #[test]
    fn query_string_is_encoded() {
        let request = ApiRequest::get("/api/products/")
            .query("search", "red shoes & socks")
            .query("category", "")
            .query("is_featured", true);
        assert_eq!(
            request.path_and_query(),
            "/api/products/?search=red%20shoes%20%26%20socks&is_featured=true"
        );
    }

    #[test]
    fn error_for_status_maps_validation() {
        let response = ApiResponse {
            status: 400,
            path: "/api/cart/items/7/".into(),
            body: json!({"error": "Insufficient stock"}),
        };
        let err = response.error_for_status().unwrap_err();
        assert_eq!(err.server_message(), Some("Insufficient stock"));
    }

    #[test]
    fn json_reports_malformed_body() {
        let response = ApiResponse {
            status: 200,
            path: "/api/auth/me/".into(),
            body: json!("not an object"),
        };
        let err = response.json::<std::collections::HashMap<String, String>>().unwrap_err();
        assert!(matches!(err, StorefrontError::MalformedResponse { status: 200, .. }));
    }
}
