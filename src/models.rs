pub mod participant;
pub mod types;
pub mod world;
pub mod zone_request;
