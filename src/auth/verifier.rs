use axum::http::{header::AUTHORIZATION, HeaderMap};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use std::sync::Arc;
use std::time::Duration;

use super::error::AuthError;
use super::jwks::{HttpJwksSource, JwksSource, KeyCache};
use super::permissions::check_permissions;
use super::Claims;
use crate::config::{AuthConfig, ConfigError};

/// Verifies provider-issued bearer tokens against the cached key set
pub struct JwtVerifier {
    keys: KeyCache,
    issuer: String,
    audience: String,
    algorithms: Vec<Algorithm>,
    leeway_secs: u64,
}

impl JwtVerifier {
    /// Verifier that fetches keys from the provider's discovery endpoint
    pub fn from_config(config: &AuthConfig) -> Result<Self, ConfigError> {
        let source = HttpJwksSource::new(config.jwks_url()?);
        Self::new(config, Arc::new(source))
    }

    pub fn new(config: &AuthConfig, source: Arc<dyn JwksSource>) -> Result<Self, ConfigError> {
        let algorithms = config
            .algorithms
            .iter()
            .map(|a| {
                a.parse::<Algorithm>().map_err(|_| ConfigError::Invalid {
                    field: "AUTH_ALGORITHMS",
                    reason: format!("unknown algorithm '{}'", a),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            keys: KeyCache::new(
                source,
                Duration::from_secs(config.jwks_ttl_secs),
                Duration::from_secs(config.jwks_min_refresh_secs),
            ),
            issuer: config.issuer(),
            audience: config.audience.clone(),
            algorithms,
            leeway_secs: config.leeway_secs,
        })
    }

    pub fn keys(&self) -> &KeyCache {
        &self.keys
    }

    /// Decode and verify a raw token: signature, issuer, audience and expiry
    pub async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let header = decode_header(token).map_err(|_| AuthError::MalformedToken)?;

        let kid = header.kid.ok_or(AuthError::InvalidHeader("Authorization malformed."))?;
        if !self.algorithms.contains(&header.alg) {
            return Err(AuthError::InvalidHeader("Token algorithm is not accepted."));
        }

        let jwk = self.keys.find(&kid).await?;
        let key = DecodingKey::from_jwk(&jwk).map_err(|_| AuthError::UnknownKey)?;

        let mut validation = Validation::new(header.alg);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        validation.leeway = self.leeway_secs;

        let data = decode::<Claims>(token, &key, &validation)?;
        Ok(data.claims)
    }

    /// Full gate for a protected route: bearer extraction, verification, permission check
    pub async fn authorize(&self, headers: &HeaderMap, permission: &str) -> Result<Claims, AuthError> {
        let token = extract_bearer(headers)?;
        let claims = self.verify(token).await?;
        check_permissions(permission, &claims)?;
        Ok(claims)
    }
}

/// Pull the token out of `Authorization: Bearer <token>`
pub fn extract_bearer(headers: &HeaderMap) -> Result<&str, AuthError> {
    let mut values = headers.get_all(AUTHORIZATION).iter();
    let value = values.next().ok_or(AuthError::MissingHeader)?;
    if values.next().is_some() {
        return Err(AuthError::InvalidHeader("Multiple Authorization headers."));
    }

    let value = value
        .to_str()
        .map_err(|_| AuthError::InvalidHeader("Authorization header is not valid text."))?;

    let parts: Vec<&str> = value.split_whitespace().collect();
    match parts.as_slice() {
        [] => Err(AuthError::MissingHeader),
        [scheme, ..] if !scheme.eq_ignore_ascii_case("bearer") => {
            Err(AuthError::InvalidHeader("Authorization header must start with \"Bearer\"."))
        }
        [_] => Err(AuthError::InvalidHeader("Token not found.")),
        [_, token] => Ok(*token),
        _ => Err(AuthError::InvalidHeader("Authorization header must be bearer token.")),
    }
}
