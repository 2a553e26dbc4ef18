pub mod error;
pub mod jwks;
pub mod permissions;
pub mod verifier;

use serde::{Deserialize, Serialize};

pub use error::AuthError;
pub use jwks::{HttpJwksSource, JwksSource, KeyCache, StaticJwksSource};
pub use permissions::check_permissions;
pub use verifier::{extract_bearer, JwtVerifier};

/// Verified token payload. Issuer, audience and expiry are checked during
/// decoding; `permissions` is the provider's RBAC claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub iss: Option<String>,
    /// String or list of strings, as issued
    #[serde(default)]
    pub aud: Option<serde_json::Value>,
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub permissions: Option<Vec<String>>,
}
