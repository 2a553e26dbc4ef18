// handlers/mod.rs - Handlers grouped by security tier
//
// Public (no token) → Protected (bearer token + one permission per route)
pub mod public;
pub mod protected;
