//! Admin server request handlers.

mod blocked;
mod decide;
mod status;

pub use blocked::{list_blocked, remove_blocked, set_blocked, update_expiration};
pub use decide::decide;
pub use status::status;
