// storage/mod.rs
// Database operations module

pub mod blocked;
pub mod migrations;
pub mod models;
pub mod pool;
pub mod test_helpers;

// Re-export commonly used items
pub use migrations::run_migrations;
pub use models::{format_expiration, now_millis, BlockDuration, BlockedCountry};
pub use pool::init_db_pool_with_path;
