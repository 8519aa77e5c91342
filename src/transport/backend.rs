//! Wire-level HTTP backends
//!
//! The transport speaks to the network through the `HttpBackend` trait so the
//! refresh logic can be exercised against scripted responses.

use super::request::Method;
use crate::config::schema::ApiConfig;
use crate::error::{StorefrontError, StorefrontResult};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// A fully resolved HTTP request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Look up a header by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body decoded as JSON, if any
    pub fn json_body(&self) -> Option<serde_json::Value> {
        self.body
            .as_deref()
            .and_then(|bytes| serde_json::from_slice(bytes).ok())
    }
}

/// Raw HTTP response; any status code is a successful exchange
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Abstract HTTP client
#[async_trait]
pub trait HttpBackend: Send + Sync {
    /// Perform one request. Errors mean no response was received.
    async fn execute(&self, request: HttpRequest) -> StorefrontResult<HttpResponse>;
}

/// Blocking `ureq` agent driven from the tokio blocking pool
#[derive(Clone)]
pub struct UreqBackend {
    agent: ureq::Agent,
}

impl UreqBackend {
    pub fn new(timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self { agent }
    }

    pub fn from_config(config: &ApiConfig) -> Self {
        Self::new(config.timeout())
    }
}

#[async_trait]
impl HttpBackend for UreqBackend {
    async fn execute(&self, request: HttpRequest) -> StorefrontResult<HttpResponse> {
        let agent = self.agent.clone();
        tokio::task::spawn_blocking(move || run_blocking(&agent, request))
            .await
            .map_err(|e| StorefrontError::Internal(format!("HTTP task failed: {}", e)))?
    }
}

fn run_blocking(agent: &ureq::Agent, request: HttpRequest) -> StorefrontResult<HttpResponse> {
    debug!("{} {}", request.method, request.url);
    let url = request.url.as_str();
    let headers = request.headers.as_slice();

    let result = match request.method {
        Method::Get => with_headers(agent.get(url), headers).call(),
        Method::Delete => with_headers(agent.delete(url), headers).call(),
        Method::Post => send_body(with_headers(agent.post(url), headers), request.body.as_deref()),
        Method::Put => send_body(with_headers(agent.put(url), headers), request.body.as_deref()),
        Method::Patch => {
            send_body(with_headers(agent.patch(url), headers), request.body.as_deref())
        }
    };

    let mut response = result.map_err(|e| StorefrontError::network(url, e))?;
    let status = response.status().as_u16();
    let body = response
        .body_mut()
        .read_to_string()
        .map_err(|e| StorefrontError::network(url, e))?;

    Ok(HttpResponse { status, body })
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn send_body(
    builder: ureq::RequestBuilder<ureq::typestate::WithBody>,
    body: Option<&[u8]>,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match body {
        Some(bytes) => builder.send(bytes),
        None => builder.send_empty(),
    }
}
