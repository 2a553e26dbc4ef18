#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{json, Map, Value};

use drinks_api::auth::{JwksSource, JwtVerifier, StaticJwksSource};
use drinks_api::config::AppConfig;
use drinks_api::database::{DatabaseManager, DrinkRepository};
use drinks_api::state::AppState;

pub const DOMAIN: &str = "coffee-shop.us.auth0.com";
pub const AUDIENCE: &str = "drinks";

pub const PRIVATE_KEY: &[u8] = include_bytes!("../fixtures/test_rsa.pem");
pub const ROTATED_KEY: &[u8] = include_bytes!("../fixtures/test_rsa_2.pem");
pub const JWKS: &str = include_str!("../fixtures/jwks.json");
pub const JWKS_ROTATED: &str = include_str!("../fixtures/jwks_rotated.json");

/// Every permission a manager token carries
pub const MANAGER: &[&str] = &["get:drinks-detail", "post:drinks", "patch:drinks", "delete:drinks"];
pub const BARISTA: &[&str] = &["get:drinks-detail"];

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Serve the full app in-process over a fresh in-memory database
    pub async fn spawn() -> Result<Self> {
        let source: Arc<dyn JwksSource> = Arc::new(StaticJwksSource::from_json(JWKS)?);
        Self::spawn_with_keys(source).await
    }

    pub async fn spawn_with_keys(source: Arc<dyn JwksSource>) -> Result<Self> {
        Self::spawn_with(config(), source).await
    }

    pub async fn spawn_with(config: AppConfig, source: Arc<dyn JwksSource>) -> Result<Self> {
        init_tracing();

        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let pool = DatabaseManager::connect(&config.database).await?;
        DatabaseManager::ensure_schema(&pool).await?;
        let verifier = JwtVerifier::new(&config.auth, source)?;
        let app = drinks_api::app(
            AppState::new(DrinkRepository::new(pool), verifier),
            &config.api,
            &config.security,
        );

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .with_context(|| format!("failed to bind {}", port))?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let server = Self {
            port,
            base_url,
            client: reqwest::Client::new(),
        };
        server.wait_ready(Duration::from_secs(10)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request with an optional bearer token and JSON body, returning status and parsed body
    pub async fn call(
        &self,
        method: reqwest::Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut req = self.client.request(method, self.url(path));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }

        let res = req.send().await?;
        let status = res.status();
        let body = res.json::<Value>().await.unwrap_or(Value::Null);
        Ok((status, body))
    }
}

/// Test configuration: in-memory database and the fixture provider
pub fn config() -> AppConfig {
    AppConfig::for_testing(DOMAIN, AUDIENCE)
}

/// Builder for RS256 tokens signed with the fixture keys.
///
/// Mirrors `TokenFactory` in `src/testing/mod.rs`, which is `cfg(test)` and so
/// not visible here; keep the default claims and `kid` of both in step.
pub struct Token {
    claims: Map<String, Value>,
    kid: String,
    key: &'static [u8],
}

impl Token {
    pub fn new() -> Self {
        let now = chrono::Utc::now().timestamp();
        let claims = json!({
            "sub": "auth0|integration",
            "iss": format!("https://{}/", DOMAIN),
            "aud": AUDIENCE,
            "iat": now,
            "exp": now + 3600,
        });

        Self {
            claims: claims.as_object().cloned().unwrap(),
            kid: "test-key-1".to_string(),
            key: PRIVATE_KEY,
        }
    }

    pub fn with_permissions(permissions: &[&str]) -> String {
        Self::new().permissions(permissions).sign()
    }

    pub fn permissions(self, permissions: &[&str]) -> Self {
        self.claim("permissions", json!(permissions))
    }

    pub fn claim(mut self, name: &str, value: Value) -> Self {
        self.claims.insert(name.to_string(), value);
        self
    }

    /// Sign with the second fixture key, published only in the rotated set
    pub fn rotated(mut self) -> Self {
        self.kid = "test-key-2".to_string();
        self.key = ROTATED_KEY;
        self
    }

    pub fn kid(mut self, kid: &str) -> Self {
        self.kid = kid.to_string();
        self
    }

    pub fn sign(self) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.kid);
        let key = EncodingKey::from_rsa_pem(self.key).expect("fixture private key");
        encode(&header, &self.claims, &key).expect("token encodes")
    }
}

fn init_tracing() {
    // optional, but keeps output tidy in tests
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}
