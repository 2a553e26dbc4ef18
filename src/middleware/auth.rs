use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::auth::{AuthError, JwtVerifier};
use crate::error::ApiError;
use crate::state::AppState;

/// Required permission for one route, plus the verifier that checks it
#[derive(Clone)]
pub struct PermissionGuard {
    verifier: Arc<JwtVerifier>,
    permission: &'static str,
}

impl PermissionGuard {
    pub fn new(state: &AppState, permission: &'static str) -> Self {
        Self {
            verifier: state.verifier.clone(),
            permission,
        }
    }
}

/// Route guard: verifies the bearer token and the route's permission, then
/// injects the verified [`crate::auth::Claims`] into request extensions.
///
/// ```ignore
/// post(create).route_layer(middleware::from_fn_with_state(
///     PermissionGuard::new(&state, "post:drinks"),
///     require_permission,
/// ))
/// ```
pub async fn require_permission(
    State(guard): State<PermissionGuard>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = guard
        .verifier
        .authorize(request.headers(), guard.permission)
        .await
        .map_err(|err| {
            match &err {
                AuthError::KeysUnavailable(reason) => {
                    tracing::error!("Cannot verify token for '{}': {}", guard.permission, reason)
                }
                AuthError::Forbidden(_) => {
                    tracing::warn!("Permission '{}' denied: {}", guard.permission, err.code())
                }
                _ => tracing::debug!("Rejected token for '{}': {} ({})", guard.permission, err.code(), err),
            }
            ApiError::from(err)
        })?;

    tracing::debug!(
        "Authorized {} for '{}'",
        claims.sub.as_deref().unwrap_or("<no subject>"),
        guard.permission
    );

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}
