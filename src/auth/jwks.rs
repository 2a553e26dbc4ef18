use async_trait::async_trait;
use jsonwebtoken::jwk::{Jwk, JwkSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::{info, warn};

use super::error::AuthError;

/// Where the provider's public signing keys come from
#[async_trait]
pub trait JwksSource: Send + Sync {
    async fn fetch(&self) -> Result<JwkSet, AuthError>;
}

/// Fetches the key set from the provider's discovery endpoint
pub struct HttpJwksSource {
    client: reqwest::Client,
    url: url::Url,
}

impl HttpJwksSource {
    pub fn new(url: url::Url) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|e| {
                warn!("Key set client for {} built without timeout: {}", url, e);
                reqwest::Client::new()
            });
        Self { client, url }
    }
}

#[async_trait]
impl JwksSource for HttpJwksSource {
    async fn fetch(&self) -> Result<JwkSet, AuthError> {
        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AuthError::KeysUnavailable(e.to_string()))?;

        response
            .json::<JwkSet>()
            .await
            .map_err(|e| AuthError::KeysUnavailable(format!("invalid key set from {}: {}", self.url, e)))
    }
}

/// Fixed key set, for offline deployments and tests
pub struct StaticJwksSource(JwkSet);

impl StaticJwksSource {
    pub fn new(keys: JwkSet) -> Self {
        Self(keys)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self(serde_json::from_str(json)?))
    }
}

#[async_trait]
impl JwksSource for StaticJwksSource {
    async fn fetch(&self) -> Result<JwkSet, AuthError> {
        Ok(self.0.clone())
    }
}

#[derive(Default)]
struct KeyState {
    keys: Option<JwkSet>,
    fetched_at: Option<Instant>,
    last_attempt: Option<Instant>,
    /// Failure of the last fetch, kept only while no keys are cached
    last_error: Option<AuthError>,
}

impl KeyState {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.map_or(false, |t| t.elapsed() < ttl)
    }

    fn recently_attempted(&self, window: Duration) -> bool {
        self.last_attempt.map_or(false, |t| t.elapsed() < window)
    }

    /// Outcome of the last fetch, if it is too recent to try again
    fn rate_limited(&self, window: Duration) -> Option<Result<JwkSet, AuthError>> {
        if !self.recently_attempted(window) {
            return None;
        }
        match (&self.keys, &self.last_error) {
            (Some(keys), _) => Some(Ok(keys.clone())),
            (None, Some(err)) => Some(Err(err.clone())),
            (None, None) => None,
        }
    }
}

enum Lookup {
    Hit(Jwk),
    Expired(Jwk),
    Failed(AuthError),
    Miss,
}

/// Process-wide cache of signing keys.
///
/// Keys expire after `ttl`. A token naming an unknown `kid` forces a refresh
/// (provider key rotation), but fetches are never attempted more often than
/// once per `min_refresh`, whether the last one succeeded or not. When a fetch
/// fails the previous keys stay in use.
///
/// Only one fetch runs at a time and it never holds the state lock, so
/// lookups that can be answered from cache (including expired keys while a
/// refresh is in flight) do not wait on the provider.
pub struct KeyCache {
    source: Arc<dyn JwksSource>,
    ttl: Duration,
    min_refresh: Duration,
    state: RwLock<KeyState>,
    fetching: Mutex<()>,
}

impl KeyCache {
    pub fn new(source: Arc<dyn JwksSource>, ttl: Duration, min_refresh: Duration) -> Self {
        Self {
            source,
            ttl,
            min_refresh,
            state: RwLock::new(KeyState::default()),
            fetching: Mutex::new(()),
        }
    }

    /// Look up the key with the given id, refreshing the set when needed
    pub async fn find(&self, kid: &str) -> Result<Jwk, AuthError> {
        let keys = match self.lookup(kid).await {
            Lookup::Hit(jwk) => return Ok(jwk),
            Lookup::Failed(err) => return Err(err),
            Lookup::Expired(jwk) => match self.fetching.try_lock() {
                Ok(guard) => self.refresh_with(guard).await?,
                // Someone else is refreshing; the expired key is still good until then
                Err(_) => return Ok(jwk),
            },
            Lookup::Miss => self.refresh().await?,
        };

        keys.find(kid).cloned().ok_or(AuthError::UnknownKey)
    }

    /// Fetch the key set now, unless another caller just did
    pub async fn refresh(&self) -> Result<JwkSet, AuthError> {
        let guard = self.fetching.lock().await;
        self.refresh_with(guard).await
    }

    async fn lookup(&self, kid: &str) -> Lookup {
        let state = self.state.read().await;
        match &state.keys {
            Some(keys) => match keys.find(kid) {
                Some(jwk) if state.is_fresh(self.ttl) => Lookup::Hit(jwk.clone()),
                Some(jwk) => Lookup::Expired(jwk.clone()),
                None if state.recently_attempted(self.min_refresh) => Lookup::Failed(AuthError::UnknownKey),
                None => Lookup::Miss,
            },
            None => match state.rate_limited(self.min_refresh) {
                Some(Err(err)) => Lookup::Failed(err),
                _ => Lookup::Miss,
            },
        }
    }

    async fn refresh_with(&self, _fetching: MutexGuard<'_, ()>) -> Result<JwkSet, AuthError> {
        // Callers queued on the fetch lock reuse the result of the fetch they waited for
        if let Some(outcome) = self.state.read().await.rate_limited(self.min_refresh) {
            return outcome;
        }

        let fetched = self.source.fetch().await;

        let mut state = self.state.write().await;
        state.last_attempt = Some(Instant::now());
        match fetched {
            Ok(keys) => {
                info!("Fetched {} signing keys", keys.keys.len());
                state.keys = Some(keys.clone());
                state.fetched_at = Some(Instant::now());
                state.last_error = None;
                Ok(keys)
            }
            Err(e) => match state.keys.clone() {
                Some(stale) => {
                    warn!("Signing key refresh failed, keeping cached keys: {}", e);
                    Ok(stale)
                }
                None => {
                    state.last_error = Some(e.clone());
                    Err(e)
                }
            },
        }
    }
}
