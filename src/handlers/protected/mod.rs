// handlers/protected/mod.rs - Protected handlers (bearer token required)
//
// Every route here is wrapped in `require_permission` with its own
// permission string, so handlers can rely on verified `Claims` in the
// request extensions.

pub mod drinks;

pub use drinks::create as drinks_create;
pub use drinks::delete as drinks_delete;
pub use drinks::detail as drinks_detail;
pub use drinks::update as drinks_update;
