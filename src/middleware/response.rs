use axum::{
    extract::Request,
    http::header::{ALLOW, CONTENT_TYPE},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};

use crate::database::models::DrinkView;
use crate::error::ApiError;

/// `{ "success": true, "drinks": [...] }`
#[derive(Debug, Serialize, Deserialize)]
pub struct DrinksResponse {
    pub success: bool,
    pub drinks: Vec<DrinkView>,
}

impl DrinksResponse {
    pub fn new(drinks: Vec<DrinkView>) -> Self {
        Self { success: true, drinks }
    }
}

impl IntoResponse for DrinksResponse {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// `{ "success": true, "delete": <id> }`
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub delete: i64,
}

impl DeleteResponse {
    pub fn new(id: i64) -> Self {
        Self { success: true, delete: id }
    }
}

impl IntoResponse for DeleteResponse {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Rewrites error responses produced outside the handlers (unknown route,
/// wrong method, extractor rejections, body limit) into the JSON error shape.
pub async fn json_errors(request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    let status = response.status();

    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |ct| ct.starts_with("application/json"));
    if is_json {
        return response;
    }

    let mut replacement = ApiError::from_status(status).into_response();
    *replacement.status_mut() = status;
    if let Some(allow) = response.headers().get(ALLOW) {
        replacement.headers_mut().insert(ALLOW, allow.clone());
    }
    replacement
}
