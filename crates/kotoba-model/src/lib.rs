pub mod client;
pub mod error;
pub mod params;

pub use client::{ModelClient, ModelConnector};
pub use error::ModelError;
pub use params::GenerationParams;
