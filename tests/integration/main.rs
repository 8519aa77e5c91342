//! Integration tests for storefront

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Nothing listens on the discard port, so requests fail fast
    const DEAD_API: &str = "http://127.0.0.1:9";

    struct Sandbox {
        dir: TempDir,
    }

    impl Sandbox {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let config = format!(
                "[general]\naudit_log = false\n\n[api]\nbase_url = '{}'\ntimeout_secs = 2\n\n[session]\nstate_dir = '{}'\n",
                DEAD_API,
                dir.path().join("state").display()
            );
            std::fs::write(dir.path().join("config.toml"), config).unwrap();
            Self { dir }
        }

        fn config_path(&self) -> PathBuf {
            self.dir.path().join("config.toml")
        }

        fn storefront(&self) -> Command {
            let mut cmd = cargo_bin_cmd!("storefront");
            cmd.env("STOREFRONT_CONFIG", self.config_path())
                .env_remove("STOREFRONT_API_URL")
                .env_remove("RUST_LOG");
            cmd
        }
    }

    #[test]
    fn help_displays() {
        cargo_bin_cmd!("storefront")
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("shop from the terminal"))
            .stdout(predicate::str::contains("checkout"));
    }

    #[test]
    fn version_displays() {
        cargo_bin_cmd!("storefront")
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("storefront"));
    }

    #[test]
    fn config_path() {
        let sandbox = Sandbox::new();
        sandbox
            .storefront()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let sandbox = Sandbox::new();
        sandbox
            .storefront()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[api]"))
            .stdout(predicate::str::contains(DEAD_API));
    }

    #[test]
    fn api_url_flag_overrides_config() {
        let sandbox = Sandbox::new();
        sandbox
            .storefront()
            .args(["config", "show", "--api-url", "http://shop.test"])
            .assert()
            .success()
            .stdout(predicate::str::contains("http://shop.test"));
    }

    #[test]
    fn config_set_keeps_comments() {
        let sandbox = Sandbox::new();
        let path = sandbox.config_path();
        let original = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, format!("# my shop\n{}", original)).unwrap();

        sandbox
            .storefront()
            .args(["config", "set", "cache.stale_time_secs", "45"])
            .assert()
            .success();

        let edited = std::fs::read_to_string(&path).unwrap();
        assert!(edited.starts_with("# my shop"));
        assert!(edited.contains("stale_time_secs = 45"));
    }

    #[test]
    fn config_set_unknown_key_warns() {
        let sandbox = Sandbox::new();
        sandbox
            .storefront()
            .args(["config", "set", "api.password", "x"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Unknown config key"));
    }

    #[test]
    fn invalid_config_reports_hint() {
        let sandbox = Sandbox::new();
        std::fs::write(sandbox.config_path(), "[api\n").unwrap();
        sandbox
            .storefront()
            .arg("categories")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"))
            .stderr(predicate::str::contains("config init --force"));
    }

    #[test]
    fn whoami_requires_login() {
        let sandbox = Sandbox::new();
        sandbox
            .storefront()
            .arg("whoami")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Not signed in"))
            .stderr(predicate::str::contains("storefront login"));
    }

    #[test]
    fn cart_requires_login() {
        let sandbox = Sandbox::new();
        sandbox
            .storefront()
            .args(["cart", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Not signed in"));
    }

    #[test]
    fn logout_without_session() {
        let sandbox = Sandbox::new();
        sandbox
            .storefront()
            .arg("logout")
            .assert()
            .success()
            .stdout(predicate::str::contains("Not signed in"));
    }

    #[test]
    fn login_needs_email_without_terminal() {
        let sandbox = Sandbox::new();
        sandbox
            .storefront()
            .arg("login")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Email required"));
    }

    #[test]
    fn login_rejects_empty_stdin_password() {
        let sandbox = Sandbox::new();
        sandbox
            .storefront()
            .args(["login", "--email", "ana@shop.test", "--password-stdin"])
            .write_stdin("\n")
            .assert()
            .failure()
            .stderr(predicate::str::contains("No password on stdin"));
    }

    #[test]
    fn unreachable_api_is_reported() {
        let sandbox = Sandbox::new();
        sandbox
            .storefront()
            .arg("categories")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Request to"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn status_survives_unreachable_api() {
        let sandbox = Sandbox::new();
        sandbox
            .storefront()
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("API unreachable"))
            .stdout(predicate::str::contains("Not signed in"));
    }

    #[test]
    fn unknown_payment_method_is_rejected() {
        let sandbox = Sandbox::new();
        sandbox
            .storefront()
            .args(["checkout", "--payment-intent", "pi_1", "--method", "cash"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("unknown payment method"));
    }

    #[test]
    fn completions_generate() {
        cargo_bin_cmd!("storefront")
            .args(["completions", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("storefront"));
    }
}

mod gateway_tests {
    use serde_json::json;
    use std::sync::Arc;
    use storefront::auth::AuthState;
    use storefront::config::Config;
    use storefront::query::QueryKey;
    use storefront::session::{CredentialPair, MemorySessionStore, SessionStore};
    use storefront::transport::{Method, ScriptedBackend};
    use storefront::{Gateway, StorefrontError};

    const CART: &str = "/api/cart/";
    const REFRESH: &str = "/api/auth/token/refresh/";
    const ME: &str = "/api/auth/me/";

    fn config() -> Config {
        let mut config = Config::default();
        config.api.base_url = "http://shop.test".to_string();
        config.general.audit_log = false;
        config.session.persist = false;
        config
    }

    fn gateway(backend: &Arc<ScriptedBackend>) -> (Gateway, Arc<MemorySessionStore>) {
        let session = Arc::new(MemorySessionStore::with_pair(CredentialPair::new("a1", "r1")));
        let gateway = Gateway::with_parts(&config(), backend.clone(), session.clone()).unwrap();
        (gateway, session)
    }

    fn cart_body() -> serde_json::Value {
        json!({"items": [], "total_items": 0, "total_amount": "0.00"})
    }

    #[tokio::test]
    async fn expired_access_token_is_renewed_once() {
        let backend = Arc::new(ScriptedBackend::new());
        backend
            .respond(Method::Get, CART, 401, json!({"detail": "Token expired"}))
            .respond(Method::Get, CART, 200, cart_body())
            .respond(Method::Post, REFRESH, 200, json!({"access": "a2"}));
        let (gateway, session) = gateway(&backend);

        let cart = gateway.cart().get().await.unwrap();
        assert!(cart.is_empty());

        let calls = backend.calls(Method::Get, CART);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].header("Authorization"), Some("Bearer a1"));
        assert_eq!(calls[1].header("Authorization"), Some("Bearer a2"));

        let refresh = backend.calls(Method::Post, REFRESH);
        assert_eq!(refresh.len(), 1);
        assert_eq!(refresh[0].header("Authorization"), None);
        assert_eq!(refresh[0].json_body().unwrap(), json!({"refresh": "r1"}));

        let pair = session.get().unwrap();
        assert_eq!(pair.access(), "a2");
        assert_eq!(pair.refresh(), Some("r1"));
    }

    #[tokio::test]
    async fn rejected_refresh_ends_session() {
        let backend = Arc::new(ScriptedBackend::new());
        backend
            .respond(Method::Get, ME, 200, json!({"id": 1, "email": "ana@shop.test"}))
            .respond(Method::Get, CART, 401, json!({"detail": "Token expired"}))
            .respond(Method::Post, REFRESH, 401, json!({"detail": "Token is invalid or expired"}));
        let (gateway, session) = gateway(&backend);

        gateway.auth().restore().await.unwrap().unwrap();
        assert_eq!(gateway.auth().state(), AuthState::LoggedIn);

        let err = gateway.cart().get().await.unwrap_err();

        assert!(matches!(err, StorefrontError::SessionExpired));
        assert!(session.get().is_none());
        assert!(gateway.cache().get_data(&QueryKey::current_user()).is_none());
        assert!(!gateway.auth().is_authenticated());
        assert_eq!(gateway.auth().state(), AuthState::SessionExpired);
        assert_eq!(backend.calls(Method::Get, CART).len(), 1);
    }

    #[test]
    fn session_expiry_is_audited_before_exit() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = config();
        config.general.audit_log = true;
        config.session.state_dir = Some(dir.path().to_path_buf());

        let backend = Arc::new(ScriptedBackend::new());
        backend
            .respond(Method::Get, CART, 401, json!({"detail": "Token expired"}))
            .respond(Method::Post, REFRESH, 401, json!({"detail": "Token is blacklisted"}));
        let session = Arc::new(MemorySessionStore::with_pair(CredentialPair::new("a1", "r1")));
        let gateway = Gateway::with_parts(&config, backend, session).unwrap();

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();
        let err = runtime.block_on(async {
            let err = gateway.cart().get().await.unwrap_err();
            gateway.shutdown().await;
            err
        });
        drop(runtime);

        assert!(matches!(err, StorefrontError::SessionExpired));
        let log = std::fs::read_to_string(dir.path().join("audit.log")).unwrap();
        let entry: serde_json::Value = serde_json::from_str(log.trim()).unwrap();
        assert_eq!(entry["event"], "auth.session_expired");
        assert_eq!(entry["data"]["origin"], "http://shop.test");
    }

    #[tokio::test]
    async fn public_catalog_needs_no_session() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.respond(
            Method::Get,
            "/api/products/categories/",
            200,
            json!([{"id": 1, "name": "Hats", "slug": "hats"}]),
        );
        let session = Arc::new(MemorySessionStore::new());
        let gateway = Gateway::with_parts(&config(), backend.clone(), session).unwrap();

        let categories = gateway.catalog().categories().await.unwrap();

        assert_eq!(categories[0].name, "Hats");
        assert!(backend.calls(Method::Post, REFRESH).is_empty());
    }
}
