use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::auth::Claims;
use crate::database::models::{Drink, DrinkPatch, NewDrink};
use crate::database::DatabaseError;
use crate::error::ApiError;
use crate::middleware::{DeleteResponse, DrinksResponse};
use crate::state::AppState;

/// GET /drinks-detail - Every drink with its full recipe (`get:drinks-detail`)
pub async fn detail(State(state): State<AppState>) -> Result<DrinksResponse, ApiError> {
    let drinks = state.drinks.select_all().await.map_err(|e| {
        log_store_error("list drinks", &e);
        ApiError::internal_server_error("Failed to load drinks")
    })?;

    Ok(DrinksResponse::new(drinks.iter().map(Drink::long).collect()))
}

/// POST /drinks - Create a drink from `{title, recipe}` (`post:drinks`)
///
/// Any failure to build or store the drink is a 400.
pub async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<DrinksResponse, ApiError> {
    let Json(body) = body.map_err(|e| {
        debug!("Rejected create body: {}", e);
        ApiError::bad_request()
    })?;
    let new_drink = NewDrink::from_json(body).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let drink = state
        .drinks
        .insert(&new_drink.title, &new_drink.recipe)
        .await
        .map_err(|e| {
            log_store_error("create drink", &e);
            ApiError::bad_request()
        })?;

    info!("{} created drink {} '{}'", actor(&claims), drink.id, drink.title);
    Ok(DrinksResponse::new(vec![drink.long()]))
}

/// PATCH /drinks/:id - Change the supplied fields only (`patch:drinks`)
///
/// Unknown id is a 404; an invalid body or a failed write is a 422.
pub async fn update(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<DrinksResponse, ApiError> {
    let existing = state.drinks.select_404(id).await.map_err(|e| match e {
        DatabaseError::NotFound(_) => ApiError::not_found(),
        other => {
            log_store_error("load drink", &other);
            ApiError::unprocessable()
        }
    })?;

    let Json(body) = body.map_err(|e| {
        debug!("Rejected update body for drink {}: {}", id, e);
        ApiError::unprocessable()
    })?;
    let patch = DrinkPatch::from_json(body).map_err(|e| ApiError::UnprocessableEntity(e.to_string()))?;

    if patch.is_empty() {
        return Ok(DrinksResponse::new(vec![existing.long()]));
    }

    let drink = state.drinks.update(&patch.apply(&existing)).await.map_err(|e| match e {
        DatabaseError::NotFound(_) => ApiError::not_found(),
        other => {
            log_store_error("update drink", &other);
            ApiError::unprocessable()
        }
    })?;

    info!("{} updated drink {}", actor(&claims), drink.id);
    Ok(DrinksResponse::new(vec![drink.long()]))
}

/// DELETE /drinks/:id - Hard delete (`delete:drinks`)
pub async fn delete(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<DeleteResponse, ApiError> {
    state.drinks.delete(id).await.map_err(|e| match e {
        DatabaseError::NotFound(_) => ApiError::not_found(),
        other => {
            log_store_error("delete drink", &other);
            ApiError::bad_request()
        }
    })?;

    info!("{} deleted drink {}", actor(&claims), id);
    Ok(DeleteResponse::new(id))
}

fn actor(claims: &Claims) -> &str {
    claims.sub.as_deref().unwrap_or("<no subject>")
}

/// Clients get a generic status; the log keeps the real cause
fn log_store_error(operation: &str, err: &DatabaseError) {
    match err {
        DatabaseError::Conflict(msg) => warn!("Failed to {}: {}", operation, msg),
        DatabaseError::NotFound(msg) => debug!("Failed to {}: {} not found", operation, msg),
        DatabaseError::Serialization(e) => error!("Failed to {}: stored recipe is corrupt: {}", operation, e),
        DatabaseError::Sqlx(e) => error!("Failed to {}: database error: {}", operation, e),
        DatabaseError::InvalidDatabaseUrl(msg) => error!("Failed to {}: {}", operation, msg),
    }
}
