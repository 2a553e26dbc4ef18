use axum::extract::State;

use crate::database::models::Drink;
use crate::error::ApiError;
use crate::middleware::DrinksResponse;
use crate::state::AppState;

/// GET /drinks - Public menu; ingredient ratios are redacted
pub async fn list(State(state): State<AppState>) -> Result<DrinksResponse, ApiError> {
    let drinks = state.drinks.select_all().await.map_err(|e| {
        tracing::error!("Failed to list drinks: {}", e);
        ApiError::internal_server_error("Failed to load drinks")
    })?;

    Ok(DrinksResponse::new(drinks.iter().map(Drink::short).collect()))
}
