use serde::{Deserialize, Serialize};

use crate::generate_content::types::{Content, GenerationConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

impl GenerateContentRequest {
    /// Single-turn user prompt with an optional generation config.
    pub fn user_text(prompt: impl Into<String>, config: Option<GenerationConfig>) -> Self {
        Self {
            contents: vec![Content::user(prompt)],
            generation_config: config,
        }
    }
}
