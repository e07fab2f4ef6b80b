use std::sync::Arc;

use tracing::debug;

use kotoba_model::GenerationParams;

use crate::connection::ConnectionManager;
use crate::error::{classify_generation, ErrorInfo};
use crate::operation::{OperationRequest, OperationResult};
use crate::prompt;

/// Entry point for every templated operation. Validation runs before any
/// connection work, so a malformed request never costs a network attempt.
pub struct RequestGateway {
    manager: Arc<ConnectionManager>,
    params: GenerationParams,
}

impl RequestGateway {
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        let config = manager.config();
        let params = GenerationParams {
            max_output_tokens: config.max_output_tokens,
            temperature: config.temperature,
        };
        Self { manager, params }
    }

    pub async fn invoke(&self, request: OperationRequest) -> Result<OperationResult, ErrorInfo> {
        request.validate_fields()?;
        let client = self.manager.ensure_ready().await?;

        let prompt = prompt::render(&request);
        debug!(operation = request.name(), "invoking model operation");
        let text = client
            .generate(&prompt, &self.params)
            .await
            .map_err(|err| classify_generation(&err))?;

        Ok(OperationResult::from_text(&request, text.trim().to_string()))
    }
}
