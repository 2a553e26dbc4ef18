use thiserror::Error;

/// Why a request failed authentication or authorization
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Authorization header is expected.")]
    MissingHeader,

    #[error("{0}")]
    InvalidHeader(&'static str),

    #[error("Unable to parse authentication token.")]
    MalformedToken,

    #[error("Unable to find the appropriate key.")]
    UnknownKey,

    #[error("Token signature could not be verified.")]
    InvalidSignature,

    #[error("Token expired.")]
    TokenExpired,

    #[error("Incorrect claims. Please, check the audience and issuer.")]
    InvalidClaims,

    #[error("Permissions not included in token.")]
    MissingPermissions,

    #[error("Permission '{0}' not granted.")]
    Forbidden(String),

    #[error("Signing keys unavailable: {0}")]
    KeysUnavailable(String),
}

impl AuthError {
    /// Machine-readable reason reported to clients
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingHeader => "authorization_header_missing",
            AuthError::InvalidHeader(_) | AuthError::MalformedToken => "invalid_header",
            AuthError::UnknownKey => "unknown_key",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::InvalidClaims | AuthError::MissingPermissions => "invalid_claims",
            AuthError::Forbidden(_) => "forbidden",
            AuthError::KeysUnavailable(_) => "jwks_unavailable",
        }
    }

    /// HTTP status the failure surfaces as
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::MalformedToken | AuthError::MissingPermissions => 400,
            AuthError::Forbidden(_) => 403,
            AuthError::KeysUnavailable(_) => 503,
            _ => 401,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            ErrorKind::InvalidIssuer
            | ErrorKind::InvalidAudience
            | ErrorKind::InvalidSubject
            | ErrorKind::ImmatureSignature
            | ErrorKind::MissingRequiredClaim(_) => AuthError::InvalidClaims,
            ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
                AuthError::MalformedToken
            }
            ErrorKind::InvalidAlgorithm | ErrorKind::MissingAlgorithm | ErrorKind::InvalidAlgorithmName => {
                AuthError::InvalidHeader("Token algorithm is not accepted.")
            }
            _ => AuthError::InvalidSignature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::errors::{Error, ErrorKind};

    #[test]
    fn statuses_follow_failure_class() {
        assert_eq!(AuthError::MissingHeader.status_code(), 401);
        assert_eq!(AuthError::TokenExpired.status_code(), 401);
        assert_eq!(AuthError::UnknownKey.status_code(), 401);
        assert_eq!(AuthError::MalformedToken.status_code(), 400);
        assert_eq!(AuthError::MissingPermissions.status_code(), 400);
        assert_eq!(AuthError::Forbidden("post:drinks".into()).status_code(), 403);
    }

    #[test]
    fn missing_permissions_and_bad_audience_share_a_code() {
        assert_eq!(AuthError::MissingPermissions.code(), "invalid_claims");
        assert_eq!(AuthError::InvalidClaims.code(), "invalid_claims");
    }

    #[test]
    fn classifies_jsonwebtoken_errors() {
        assert_eq!(AuthError::from(Error::from(ErrorKind::ExpiredSignature)), AuthError::TokenExpired);
        assert_eq!(AuthError::from(Error::from(ErrorKind::InvalidAudience)), AuthError::InvalidClaims);
        assert_eq!(AuthError::from(Error::from(ErrorKind::InvalidSignature)), AuthError::InvalidSignature);
        assert_eq!(AuthError::from(Error::from(ErrorKind::InvalidToken)), AuthError::MalformedToken);
    }
}
