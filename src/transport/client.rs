//! Authenticated transport with one-shot credential refresh

use super::backend::{HttpBackend, HttpRequest, HttpResponse};
use super::request::{ApiRequest, ApiResponse, AuthMode};
use crate::config::schema::ApiConfig;
use crate::error::{StorefrontError, StorefrontResult};
use crate::session::{CredentialPair, RefreshRequest, RefreshResponse, SessionStore};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Callback run right after the credential pair was dropped because the
/// session could not be renewed.
pub type ExpiryHook = Arc<dyn Fn() + Send + Sync>;

/// Sends API requests, injecting the bearer credential per request and
/// renewing it once on 401.
pub struct Transport {
    backend: Arc<dyn HttpBackend>,
    session: Arc<dyn SessionStore>,
    api: ApiConfig,
    base_url: String,
    on_expired: Option<ExpiryHook>,
}

impl Transport {
    pub fn new(
        api: ApiConfig,
        backend: Arc<dyn HttpBackend>,
        session: Arc<dyn SessionStore>,
    ) -> StorefrontResult<Self> {
        crate::session::store::origin_of(&api.base_url)?;
        let base_url = api.base_url.trim().trim_end_matches('/').to_string();
        Ok(Self {
            backend,
            session,
            api,
            base_url,
            on_expired: None,
        })
    }

    /// Install the hook invoked when the session expires
    pub fn on_session_expired(mut self, hook: ExpiryHook) -> Self {
        self.on_expired = Some(hook);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api(&self) -> &ApiConfig {
        &self.api
    }

    pub fn session(&self) -> &Arc<dyn SessionStore> {
        &self.session
    }

    /// Configured auth endpoints are public whatever the request says
    fn is_public(&self, request: &ApiRequest) -> bool {
        request.auth == AuthMode::Public
            || self
                .api
                .public_paths()
                .iter()
                .any(|p| request.path.trim_end_matches('/') == p.trim_end_matches('/'))
    }

    /// Send a request and fail on non-2xx statuses
    pub async fn send(&self, request: ApiRequest) -> StorefrontResult<ApiResponse> {
        self.execute(request).await?.error_for_status()
    }

    /// Send a request and decode the JSON body
    pub async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> StorefrontResult<T> {
        self.send(request).await?.json()
    }

    /// Send a request, returning any HTTP status as a response.
    ///
    /// Only the refresh cycle is handled here: a 401 on a protected request
    /// that carried a credential triggers exactly one refresh and one retry.
    pub async fn execute(&self, request: ApiRequest) -> StorefrontResult<ApiResponse> {
        let public = self.is_public(&request);
        let credentials = if public { None } else { self.session.get() };

        if request.auth == AuthMode::Required && credentials.is_none() {
            debug!("Skipping {} {}: no session", request.method, request.path);
            return Err(StorefrontError::NotAuthenticated);
        }

        let response = self.dispatch(&request, credentials.as_ref()).await?;
        if response.status != 401 || public {
            return Ok(response);
        }

        let Some(credentials) = credentials else {
            return Ok(response);
        };

        debug!("{} {} returned 401, refreshing", request.method, request.path);
        let renewed = match self.refresh(&credentials).await {
            Ok(renewed) => renewed,
            Err(e) => {
                warn!("Token refresh failed: {}", e);
                return Err(self.expire());
            }
        };

        let renewed = if self.session.rotate(credentials.access(), renewed.clone())? {
            renewed
        } else {
            // Another refresh or a login won the race; a logout leaves nothing
            match self.session.get() {
                Some(current) => {
                    debug!("Session changed during refresh, retrying with the current token");
                    current
                }
                None => {
                    debug!("Session cleared during refresh, not retrying");
                    return Err(StorefrontError::NotAuthenticated);
                }
            }
        };

        let retried = self.dispatch(&request, Some(&renewed)).await?;
        if retried.status == 401 {
            warn!("{} {} rejected after refresh", request.method, request.path);
            return Err(self.expire());
        }
        Ok(retried)
    }

    /// Exchange the refresh token for a new access token
    async fn refresh(&self, credentials: &CredentialPair) -> StorefrontResult<CredentialPair> {
        let refresh = credentials
            .refresh()
            .ok_or_else(|| StorefrontError::Unauthorized {
                message: "no refresh token stored".to_string(),
            })?;

        let request = ApiRequest::post(self.api.refresh_path.clone())
            .public()
            .json(&RefreshRequest { refresh })?;
        let tokens: RefreshResponse = self
            .dispatch(&request, None)
            .await?
            .error_for_status()?
            .json()?;

        info!("Access token refreshed");
        Ok(credentials.renewed(tokens.access, tokens.refresh))
    }

    /// Drop the session and notify the expiry hook in one step
    fn expire(&self) -> StorefrontError {
        if let Err(e) = self.session.clear() {
            warn!("Failed to clear expired session: {}", e);
        }
        if let Some(ref hook) = self.on_expired {
            hook();
        }
        info!("Session expired");
        StorefrontError::SessionExpired
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
        credentials: Option<&CredentialPair>,
    ) -> StorefrontResult<ApiResponse> {
        let mut headers = vec![("Accept".to_string(), "application/json".to_string())];
        if let Some(pair) = credentials {
            headers.push(("Authorization".to_string(), pair.bearer()));
        }

        let body = match request.body {
            Some(ref value) => {
                headers.push(("Content-Type".to_string(), "application/json".to_string()));
                Some(serde_json::to_vec(value)?)
            }
            None => None,
        };

        let http = HttpRequest {
            method: request.method,
            url: format!("{}{}", self.base_url, request.path_and_query()),
            headers,
            body,
        };

        let response = self.backend.execute(http).await?;
        decode(&request.path, response)
    }
}

/// Decode a raw response. Empty bodies become `null`; non-JSON bodies are
/// kept as text on errors and rejected on success.
fn decode(path: &str, response: HttpResponse) -> StorefrontResult<ApiResponse> {
    let HttpResponse { status, body } = response;
    let success = (200..300).contains(&status);

    let body = if body.trim().is_empty() {
        Value::Null
    } else {
        match serde_json::from_str(&body) {
            Ok(value) => value,
            Err(_) if !success => Value::String(body),
            Err(e) => {
                return Err(StorefrontError::MalformedResponse {
                    path: path.to_string(),
                    status,
                    reason: e.to_string(),
                })
            }
        }
    };

    Ok(ApiResponse {
        status,
        path: path.to_string(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySessionStore;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replies with queued responses and records every request
    #[derive(Default)]
    struct Scripted {
        replies: Mutex<VecDeque<StorefrontResult<HttpResponse>>>,
        seen: Mutex<Vec<HttpRequest>>,
        /// Runs while the refresh call is in flight
        during_refresh: Mutex<Option<Box<dyn FnOnce() + Send>>>,
    }

    impl Scripted {
        fn reply(self, status: u16, body: Value) -> Self {
            self.replies.lock().unwrap().push_back(Ok(HttpResponse {
                status,
                body: body.to_string(),
            }));
            self
        }

        fn fail(self) -> Self {
            self.replies
                .lock()
                .unwrap()
                .push_back(Err(StorefrontError::network("http://shop.test", "connection refused")));
            self
        }

        fn during_refresh(self, f: impl FnOnce() + Send + 'static) -> Self {
            *self.during_refresh.lock().unwrap() = Some(Box::new(f));
            self
        }

        fn seen(&self) -> Vec<HttpRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpBackend for Scripted {
        async fn execute(&self, request: HttpRequest) -> StorefrontResult<HttpResponse> {
            if request.url.ends_with("/api/auth/token/refresh/") {
                if let Some(f) = self.during_refresh.lock().unwrap().take() {
                    f();
                }
            }
            self.seen.lock().unwrap().push(request);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(StorefrontError::Internal("no scripted reply".into())))
        }
    }

    fn api() -> ApiConfig {
        ApiConfig {
            base_url: "http://shop.test/".to_string(),
            ..ApiConfig::default()
        }
    }

    fn transport(
        backend: Scripted,
        session: MemorySessionStore,
    ) -> (Transport, Arc<Scripted>, Arc<MemorySessionStore>, Arc<AtomicUsize>) {
        let backend = Arc::new(backend);
        let session = Arc::new(session);
        let expired = Arc::new(AtomicUsize::new(0));
        let counter = expired.clone();
        let transport = Transport::new(api(), backend.clone(), session.clone())
            .unwrap()
            .on_session_expired(Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }));
        (transport, backend, session, expired)
    }

    #[tokio::test]
    async fn attaches_bearer_to_protected_requests() {
        let (transport, backend, _, _) = transport(
            Scripted::default().reply(200, json!({"items": []})),
            MemorySessionStore::with_pair(CredentialPair::new("a1", "r1")),
        );

        transport.send(ApiRequest::get("/api/cart/")).await.unwrap();

        let seen = backend.seen();
        assert_eq!(seen[0].url, "http://shop.test/api/cart/");
        assert_eq!(seen[0].header("Authorization"), Some("Bearer a1"));
    }

    #[tokio::test]
    async fn public_endpoints_never_carry_bearer() {
        let (transport, backend, _, _) = transport(
            Scripted::default().reply(200, json!({"access": "a", "refresh": "r"})),
            MemorySessionStore::with_pair(CredentialPair::new("a1", "r1")),
        );

        // Not flagged public, but the path is the configured login endpoint
        transport
            .send(ApiRequest::post("/api/auth/login/").json(&json!({})).unwrap())
            .await
            .unwrap();

        assert_eq!(backend.seen()[0].header("Authorization"), None);
    }

    #[tokio::test]
    async fn public_401_is_ordinary_error() {
        let (transport, backend, session, expired) = transport(
            Scripted::default().reply(401, json!({"detail": "No active account"})),
            MemorySessionStore::with_pair(CredentialPair::new("a1", "r1")),
        );

        let err = transport
            .send(ApiRequest::post("/api/auth/login/").public())
            .await
            .unwrap_err();

        assert!(matches!(err, StorefrontError::Unauthorized { .. }));
        assert_eq!(err.server_message(), Some("No active account"));
        assert_eq!(backend.seen().len(), 1);
        assert!(session.get().is_some());
        assert_eq!(expired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn refreshes_once_and_retries() {
        let (transport, backend, session, expired) = transport(
            Scripted::default()
                .reply(401, json!({"detail": "Token expired"}))
                .reply(200, json!({"access": "a2"}))
                .reply(200, json!({"items": [{"id": 7, "quantity": 2}]})),
            MemorySessionStore::with_pair(CredentialPair::new("a1", "r1")),
        );

        let cart: Value = transport
            .send_json(ApiRequest::get("/api/cart/"))
            .await
            .unwrap();

        assert_eq!(cart["items"][0]["quantity"], 2);
        let seen = backend.seen();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[1].url, "http://shop.test/api/auth/token/refresh/");
        assert_eq!(seen[1].header("Authorization"), None);
        assert_eq!(
            serde_json::from_slice::<Value>(seen[1].body.as_deref().unwrap()).unwrap(),
            json!({"refresh": "r1"})
        );
        assert_eq!(seen[2].header("Authorization"), Some("Bearer a2"));

        let pair = session.get().unwrap();
        assert_eq!(pair.access(), "a2");
        assert_eq!(pair.refresh(), Some("r1"));
        assert_eq!(expired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn stores_rotated_refresh_token() {
        let (transport, _, session, _) = transport(
            Scripted::default()
                .reply(401, Value::Null)
                .reply(200, json!({"access": "a2", "refresh": "r2"}))
                .reply(200, json!({})),
            MemorySessionStore::with_pair(CredentialPair::new("a1", "r1")),
        );

        transport.send(ApiRequest::get("/api/cart/")).await.unwrap();
        assert_eq!(session.get().unwrap().refresh(), Some("r2"));
    }

    #[tokio::test]
    async fn repeated_401_expires_after_single_retry() {
        let (transport, backend, session, expired) = transport(
            Scripted::default()
                .reply(401, Value::Null)
                .reply(200, json!({"access": "a2"}))
                .reply(401, Value::Null)
                .reply(401, Value::Null),
            MemorySessionStore::with_pair(CredentialPair::new("a1", "r1")),
        );

        let err = transport.send(ApiRequest::get("/api/cart/")).await.unwrap_err();

        assert!(err.is_session_expired());
        let seen = backend.seen();
        assert_eq!(seen.len(), 3);
        let refreshes = seen
            .iter()
            .filter(|r| r.url.ends_with("/api/auth/token/refresh/"))
            .count();
        assert_eq!(refreshes, 1);
        assert!(session.get().is_none());
        assert_eq!(expired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalid_refresh_token_clears_session_without_retry() {
        let (transport, backend, session, expired) = transport(
            Scripted::default()
                .reply(401, Value::Null)
                .reply(401, json!({"detail": "Token is invalid or expired"})),
            MemorySessionStore::with_pair(CredentialPair::new("a1", "bad")),
        );

        let err = transport.send(ApiRequest::get("/api/cart/")).await.unwrap_err();

        assert!(err.is_session_expired());
        assert_eq!(backend.seen().len(), 2);
        assert!(session.get().is_none());
        assert_eq!(expired.load(Ordering::SeqCst), 1);

        // Protected reads are not attempted afterwards
        let err = transport
            .send(ApiRequest::get("/api/cart/").authenticated())
            .await
            .unwrap_err();
        assert!(matches!(err, StorefrontError::NotAuthenticated));
        assert_eq!(backend.seen().len(), 2);
    }

    #[tokio::test]
    async fn refresh_network_failure_expires_session() {
        let (transport, _, session, _) = transport(
            Scripted::default().reply(401, Value::Null).fail(),
            MemorySessionStore::with_pair(CredentialPair::new("a1", "r1")),
        );

        let err = transport.send(ApiRequest::get("/api/cart/")).await.unwrap_err();
        assert!(err.is_session_expired());
        assert!(session.get().is_none());
    }

    #[tokio::test]
    async fn missing_refresh_token_expires_session() {
        let (transport, backend, session, _) = transport(
            Scripted::default().reply(401, Value::Null),
            MemorySessionStore::with_pair(CredentialPair::access_only("a1")),
        );

        let err = transport.send(ApiRequest::get("/api/cart/")).await.unwrap_err();
        assert!(err.is_session_expired());
        assert_eq!(backend.seen().len(), 1);
        assert!(session.get().is_none());
    }

    #[tokio::test]
    async fn lost_refresh_race_retries_with_current_token() {
        let session = Arc::new(MemorySessionStore::with_pair(CredentialPair::new("a1", "r1")));
        let racer = session.clone();
        let backend = Arc::new(
            Scripted::default()
                .reply(401, Value::Null)
                .reply(200, json!({"access": "a2"}))
                .reply(200, json!({"items": []}))
                .during_refresh(move || {
                    racer.set(CredentialPair::new("a9", "r9")).unwrap();
                }),
        );
        let transport = Transport::new(api(), backend.clone(), session.clone()).unwrap();

        transport.send(ApiRequest::get("/api/cart/")).await.unwrap();

        let seen = backend.seen();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[2].header("Authorization"), Some("Bearer a9"));
        assert_eq!(session.get().unwrap().access(), "a9");
    }

    #[tokio::test]
    async fn logout_during_refresh_skips_retry() {
        let session = Arc::new(MemorySessionStore::with_pair(CredentialPair::new("a1", "r1")));
        let racer = session.clone();
        let backend = Arc::new(
            Scripted::default()
                .reply(401, Value::Null)
                .reply(200, json!({"access": "a2"}))
                .during_refresh(move || {
                    racer.clear().unwrap();
                }),
        );
        let transport = Transport::new(api(), backend.clone(), session.clone()).unwrap();

        let err = transport.send(ApiRequest::get("/api/cart/")).await.unwrap_err();

        assert!(matches!(err, StorefrontError::NotAuthenticated));
        assert_eq!(backend.seen().len(), 2);
        assert!(session.get().is_none());
    }

    #[tokio::test]
    async fn anonymous_401_is_unauthorized() {
        let (transport, backend, _, expired) = transport(
            Scripted::default().reply(401, json!({"detail": "Authentication required"})),
            MemorySessionStore::new(),
        );

        let err = transport.send(ApiRequest::get("/api/cart/")).await.unwrap_err();
        assert!(matches!(err, StorefrontError::Unauthorized { .. }));
        assert_eq!(backend.seen().len(), 1);
        assert_eq!(expired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn required_auth_fails_fast_without_session() {
        let (transport, backend, _, _) = transport(Scripted::default(), MemorySessionStore::new());

        let err = transport
            .send(ApiRequest::get("/api/auth/me/").authenticated())
            .await
            .unwrap_err();
        assert!(matches!(err, StorefrontError::NotAuthenticated));
        assert!(backend.seen().is_empty());
    }

    #[tokio::test]
    async fn validation_errors_pass_through() {
        let (transport, _, _, _) = transport(
            Scripted::default().reply(400, json!({"name": ["This field is required."]})),
            MemorySessionStore::with_pair(CredentialPair::new("a1", "r1")),
        );

        let err = transport
            .send(ApiRequest::post("/api/products/").json(&json!({})).unwrap())
            .await
            .unwrap_err();
        assert_eq!(
            err.payload(),
            Some(&json!({"name": ["This field is required."]}))
        );
    }

    #[test]
    fn decode_handles_empty_and_text_bodies() {
        let empty = decode("/api/cart/clear/", HttpResponse { status: 204, body: String::new() })
            .unwrap();
        assert_eq!(empty.body, Value::Null);

        let text = decode(
            "/api/x/",
            HttpResponse {
                status: 502,
                body: "<html>Bad gateway</html>".into(),
            },
        )
        .unwrap();
        assert_eq!(text.body, json!("<html>Bad gateway</html>"));

        let err = decode(
            "/api/x/",
            HttpResponse {
                status: 200,
                body: "<html>".into(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, StorefrontError::MalformedResponse { .. }));
    }

    #[test]
    fn rejects_invalid_base_url() {
        let config = ApiConfig {
            base_url: "shop.test".into(),
            ..ApiConfig::default()
        };
        let result = Transport::new(
            config,
            Arc::new(Scripted::default()),
            Arc::new(MemorySessionStore::new()),
        );
        assert!(matches!(result, Err(StorefrontError::InvalidBaseUrl(_))));
    }
}
