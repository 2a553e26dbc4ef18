use super::error::AuthError;
use super::Claims;

/// Plain membership test of `permission` in the token's `permissions` claim
pub fn check_permissions(permission: &str, claims: &Claims) -> Result<(), AuthError> {
    let granted = claims.permissions.as_ref().ok_or(AuthError::MissingPermissions)?;

    if !granted.iter().any(|p| p == permission) {
        return Err(AuthError::Forbidden(permission.to_string()));
    }
    Ok(())
}
