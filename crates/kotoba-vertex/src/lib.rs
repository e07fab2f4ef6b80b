pub mod client;
pub mod credentials;
pub mod token;

pub use client::{VertexClient, VertexConnector, VertexSettings};
pub use credentials::ServiceAccountKey;
