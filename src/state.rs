use std::sync::Arc;

use crate::auth::JwtVerifier;
use crate::database::DrinkRepository;

/// Shared per-process state: the drink store and the token verifier (with its key cache)
#[derive(Clone)]
pub struct AppState {
    pub drinks: DrinkRepository,
    pub verifier: Arc<JwtVerifier>,
}

impl AppState {
    pub fn new(drinks: DrinkRepository, verifier: JwtVerifier) -> Self {
        Self {
            drinks,
            verifier: Arc::new(verifier),
        }
    }
}
