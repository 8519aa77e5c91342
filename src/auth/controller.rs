//! Login, registration and logout

use super::state::{AuthFailure, AuthState, AuthStateHandle};
use crate::api::models::UserProfile;
use crate::api::ApiContext;
use crate::audit::{self, AuditLog};
use crate::error::StorefrontError;
use crate::query::{QueryCache, QueryKey, ReadOptions};
use crate::session::{CredentialPair, SessionStore, TokenResponse};
use crate::transport::{ApiRequest, ExpiryHook, Transport};
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

const SIGN_IN_FAILED: &str = "Unable to sign in";
const REGISTER_FAILED: &str = "Unable to register";
const PROFILE_FAILED: &str = "Unable to load your profile";

/// Email and password for the login endpoint
#[derive(Clone, Serialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

impl LoginCredentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Account details for the register endpoint
#[derive(Clone, Default, Serialize)]
pub struct Registration {
    pub email: String,
    pub username: String,
    pub password: String,
    pub password_confirm: String,
    pub first_name: String,
    pub last_name: String,
}

impl Registration {
    fn credentials(&self) -> LoginCredentials {
        LoginCredentials::new(self.email.clone(), self.password.clone())
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("email", &self.email)
            .field("username", &self.username)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .finish_non_exhaustive()
    }
}

/// Keeps the stored credential and the current-user cache entry in step.
///
/// A user counts as authenticated exactly when the current-user entry holds
/// a profile; every path that drops the credential also clears the cache.
#[derive(Clone)]
pub struct AuthController {
    api: ApiContext,
    state: AuthStateHandle,
    audit: AuditLog,
}

impl AuthController {
    pub fn new(api: ApiContext, state: AuthStateHandle, audit: AuditLog) -> Self {
        Self { api, state, audit }
    }

    /// Hook for [`Transport::on_session_expired`]: clears the cache and
    /// records the expiry. Runs right after the transport drops the session.
    pub fn expiry_hook(
        cache: QueryCache,
        state: AuthStateHandle,
        audit: AuditLog,
        origin: String,
    ) -> ExpiryHook {
        Arc::new(move || {
            cache.clear();
            state.set(AuthState::SessionExpired);
            audit.spawn_log(audit::SESSION_EXPIRED, json!({ "origin": origin }));
        })
    }

    fn transport(&self) -> &Arc<Transport> {
        &self.api.transport
    }

    fn session(&self) -> &Arc<dyn SessionStore> {
        self.transport().session()
    }

    fn current_user_request(&self) -> ApiRequest {
        ApiRequest::get(self.transport().api().current_user_path.clone()).authenticated()
    }

    pub fn state(&self) -> AuthState {
        self.state.get()
    }

    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// Whether the current-user entry holds a profile
    pub fn is_authenticated(&self) -> bool {
        self.api
            .cache
            .get_data(&QueryKey::current_user())
            .is_some_and(|user| !user.is_null())
    }

    /// Cached profile of the signed-in user
    pub fn current_user(&self) -> Option<UserProfile> {
        self.api
            .cache
            .get_as(&QueryKey::current_user())
            .ok()
            .flatten()
    }

    /// Sign in with email and password
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<UserProfile, AuthFailure> {
        self.state.set(AuthState::LoggingIn);
        let result = self.login_inner(credentials).await;
        self.finish(audit::LOGIN, &credentials.email, result).await
    }

    async fn login_inner(&self, credentials: &LoginCredentials) -> Result<UserProfile, AuthFailure> {
        let request = ApiRequest::post(self.transport().api().login_path.clone())
            .public()
            .json(credentials)
            .map_err(|e| AuthFailure::from_error(e, SIGN_IN_FAILED))?;

        let tokens: TokenResponse = self
            .transport()
            .send_json(request)
            .await
            .map_err(|e| AuthFailure::from_error(e, SIGN_IN_FAILED))?;

        self.establish(tokens.into()).await
    }

    /// Create an account, then sign in.
    ///
    /// Tokens in the register response are used directly; otherwise the new
    /// account signs in with the same email and password.
    pub async fn register(&self, registration: &Registration) -> Result<UserProfile, AuthFailure> {
        self.state.set(AuthState::LoggingIn);
        let result = self.register_inner(registration).await;
        self.finish(audit::REGISTER, &registration.email, result).await
    }

    async fn register_inner(&self, registration: &Registration) -> Result<UserProfile, AuthFailure> {
        let request = ApiRequest::post(self.transport().api().register_path.clone())
            .public()
            .json(registration)
            .map_err(|e| AuthFailure::from_error(e, REGISTER_FAILED))?;

        let response: Value = self
            .transport()
            .send_json(request)
            .await
            .map_err(|e| AuthFailure::from_error(e, REGISTER_FAILED))?;

        match serde_json::from_value::<TokenResponse>(response) {
            Ok(tokens) => self.establish(tokens.into()).await,
            Err(_) => {
                debug!("Register response carried no tokens, signing in");
                self.login_inner(&registration.credentials()).await
            }
        }
    }

    /// Store `pair` and load the profile it belongs to
    async fn establish(&self, pair: CredentialPair) -> Result<UserProfile, AuthFailure> {
        // Data cached for a previous account must not outlive the switch
        self.api.cache.clear();
        self.session()
            .set(pair)
            .map_err(|e| AuthFailure::from_error(e, SIGN_IN_FAILED))?;

        let loaded = self
            .api
            .cache
            .refetch(&QueryKey::current_user(), self.api.fetch(self.current_user_request()))
            .await
            .and_then(|user| serde_json::from_value::<UserProfile>(user).map_err(StorefrontError::from));

        match loaded {
            Ok(user) => Ok(user),
            Err(e) => {
                warn!("Signed in but the profile could not be loaded: {}", e);
                self.end_session();
                Err(AuthFailure::from_error(e, PROFILE_FAILED))
            }
        }
    }

    async fn finish(
        &self,
        event: &str,
        email: &str,
        result: Result<UserProfile, AuthFailure>,
    ) -> Result<UserProfile, AuthFailure> {
        match result {
            Ok(user) => {
                self.state.set(AuthState::LoggedIn);
                info!("Signed in as {}", user.email);
                self.audit
                    .log(event, &json!({ "origin": self.transport().base_url(), "email": user.email }))
                    .await;
                Ok(user)
            }
            Err(failure) => {
                debug!("{} for {} failed: {}", event, email, failure);
                let state = if self.session().is_present() {
                    AuthState::LoggedIn
                } else if failure.expired {
                    AuthState::SessionExpired
                } else {
                    AuthState::LoggedOut
                };
                self.state.set(state);
                Err(failure)
            }
        }
    }

    /// Drop the credential and every cached entry with no await in between
    fn end_session(&self) {
        if let Err(e) = self.session().clear() {
            warn!("Failed to clear session: {}", e);
        }
        self.api.cache.clear();
    }

    /// Sign out. Always leaves no credential and an empty cache behind.
    pub async fn logout(&self) -> Result<(), AuthFailure> {
        let email = self.current_user().map(|u| u.email);
        let cleared = self.session().clear();
        self.api.cache.clear();
        self.state.set(AuthState::LoggedOut);

        self.audit
            .log(
                audit::LOGOUT,
                &json!({ "origin": self.transport().base_url(), "email": email }),
            )
            .await;

        cleared.map_err(|e| AuthFailure::from_error(e, "Unable to sign out"))
    }

    /// Resume a stored session, loading the profile (renewing the token if
    /// needed). Returns `None` when nobody is signed in.
    pub async fn restore(&self) -> Result<Option<UserProfile>, AuthFailure> {
        if !self.session().is_present() {
            if self.state() != AuthState::SessionExpired {
                self.state.set(AuthState::LoggedOut);
            }
            return Ok(None);
        }

        let fetched = self
            .api
            .cache
            .read_as::<UserProfile>(
                &QueryKey::current_user(),
                self.api.fetch(self.current_user_request()),
                ReadOptions::default(),
            )
            .await;

        match fetched {
            Ok(user) => {
                self.state.set(AuthState::LoggedIn);
                Ok(Some(user))
            }
            Err(StorefrontError::SessionExpired) => Ok(None),
            Err(e) => Err(AuthFailure::from_error(e, PROFILE_FAILED)),
        }
    }
}
