pub mod broadcaster;
pub mod movement;
pub mod session_manager;
pub mod zone_access;

pub use session_manager::{Delivery, ExpiryOrder, Hub, Notice, Outcome};
