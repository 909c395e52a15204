pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod net;
pub mod services;
pub mod state;

// Convenient re-exports (so call sites can do `zonemeet::Hub`, etc.)
pub use engine::{EngineHandle, start_engine};
pub use services::Hub;
pub use state::session::Session;
