// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Security Level: None
// Middleware: JSON error normalization only

pub mod drinks;
pub mod system;

pub use drinks::list as drinks_list;
pub use system::{health, root};
