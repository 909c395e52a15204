pub mod registry;
pub mod requests;
pub mod session;
