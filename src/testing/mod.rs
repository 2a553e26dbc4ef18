use std::sync::Arc;

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Map, Value};

use crate::auth::{JwksSource, JwtVerifier, StaticJwksSource};
use crate::config::AppConfig;
use crate::database::{DatabaseManager, DrinkRepository};
use crate::state::AppState;

pub const DOMAIN: &str = "coffee-shop.us.auth0.com";
pub const AUDIENCE: &str = "drinks";

const PRIVATE_KEY: &[u8] = include_bytes!("../../tests/fixtures/test_rsa.pem");
const FOREIGN_KEY: &[u8] = include_bytes!("../../tests/fixtures/test_rsa_2.pem");
const JWKS: &str = include_str!("../../tests/fixtures/jwks.json");

/// Mints RS256 tokens signed with the fixture key published in `jwks.json`.
///
/// `tests/common/mod.rs` carries a copy (`Token`) for the integration tests;
/// keep the default claims and `kid` of both in step.
pub struct TokenFactory {
    claims: Map<String, Value>,
    kid: String,
    key: &'static [u8],
}

impl TokenFactory {
    pub fn new() -> Self {
        let now = chrono::Utc::now().timestamp();
        let claims = json!({
            "sub": "auth0|barista",
            "iss": format!("https://{}/", DOMAIN),
            "aud": AUDIENCE,
            "iat": now,
            "exp": now + 3600,
        });

        Self {
            claims: claims.as_object().cloned().unwrap_or_default(),
            kid: "test-key-1".to_string(),
            key: PRIVATE_KEY,
        }
    }

    pub fn static_source() -> Arc<dyn JwksSource> {
        Arc::new(StaticJwksSource::from_json(JWKS).expect("fixture key set"))
    }

    pub fn permissions(self, permissions: &[&str]) -> Self {
        self.claim("permissions", json!(permissions))
    }

    pub fn expires_in(self, secs: i64) -> Self {
        let exp = chrono::Utc::now().timestamp() + secs;
        self.claim("exp", json!(exp))
    }

    pub fn claim(mut self, name: &str, value: Value) -> Self {
        self.claims.insert(name.to_string(), value);
        self
    }

    pub fn kid(mut self, kid: &str) -> Self {
        self.kid = kid.to_string();
        self
    }

    /// Sign with a key that is not in the published set while keeping the published `kid`
    pub fn signed_with_foreign_key(mut self) -> Self {
        self.key = FOREIGN_KEY;
        self
    }

    pub fn sign(self) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.kid);
        let key = EncodingKey::from_rsa_pem(self.key).expect("fixture private key");
        encode(&header, &self.claims, &key).expect("token encodes")
    }
}

/// Application state over a fresh in-memory database and the fixture key set
pub async fn test_state() -> AppState {
    let config = AppConfig::for_testing(DOMAIN, AUDIENCE);
    let pool = DatabaseManager::connect(&config.database).await.expect("in-memory pool");
    DatabaseManager::ensure_schema(&pool).await.expect("schema");

    let verifier = JwtVerifier::new(&config.auth, TokenFactory::static_source()).expect("verifier");
    AppState::new(DrinkRepository::new(pool), verifier)
}
