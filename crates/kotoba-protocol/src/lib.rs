pub mod error;
pub mod generate_content;

pub use error::ErrorBody;
pub use generate_content::{GenerateContentRequest, GenerateContentResponse};
