pub mod types;
pub mod request;
pub mod response;

pub use request::GenerateContentRequest;
pub use response::{Candidate, GenerateContentResponse};
pub use types::*;
