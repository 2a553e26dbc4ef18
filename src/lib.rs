use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{delete, get, patch, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod state;

#[cfg(test)]
pub mod testing;

use config::{ApiConfig, SecurityConfig};
use error::ApiError;
use middleware::{json_errors, require_permission, PermissionGuard};
use state::AppState;

/// Full application router: public menu, permission-guarded drink routes,
/// and the global middleware stack.
pub fn app(state: AppState, api: &ApiConfig, security: &SecurityConfig) -> Router {
    use handlers::public;

    Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        // Drinks (public listing plus guarded mutations)
        .merge(drinks_routes(&state))
        .fallback(not_found)
        .with_state(state)
        // Global middleware
        .layer(axum_middleware::from_fn(json_errors))
        .layer(DefaultBodyLimit::max(api.max_request_size_bytes))
        .layer(cors_layer(security))
        .layer(TraceLayer::new_for_http())
}

fn drinks_routes(state: &AppState) -> Router<AppState> {
    use handlers::{protected, public};

    Router::new()
        .route("/drinks", get(public::drinks_list))
        .route(
            "/drinks",
            post(protected::drinks_create).route_layer(axum_middleware::from_fn_with_state(
                PermissionGuard::new(state, "post:drinks"),
                require_permission,
            )),
        )
        .route(
            "/drinks-detail",
            get(protected::drinks_detail).route_layer(axum_middleware::from_fn_with_state(
                PermissionGuard::new(state, "get:drinks-detail"),
                require_permission,
            )),
        )
        .route(
            "/drinks/:id",
            patch(protected::drinks_update).route_layer(axum_middleware::from_fn_with_state(
                PermissionGuard::new(state, "patch:drinks"),
                require_permission,
            )),
        )
        .route(
            "/drinks/:id",
            delete(protected::drinks_delete).route_layer(axum_middleware::from_fn_with_state(
                PermissionGuard::new(state, "delete:drinks"),
                require_permission,
            )),
        )
}

async fn not_found() -> ApiError {
    ApiError::not_found()
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if !security.enable_cors {
        // No allowed origins: CORS headers are never emitted
        return CorsLayer::new();
    }

    let origins = if security.cors_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            security
                .cors_origins
                .iter()
                .filter_map(|o| match o.parse::<HeaderValue>() {
                    Ok(v) => Some(v),
                    Err(_) => {
                        tracing::warn!("Ignoring invalid CORS origin '{}'", o);
                        None
                    }
                }),
        )
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
}
