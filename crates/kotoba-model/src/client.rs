use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ModelError;
use crate::params::GenerationParams;

/// One established handle to the remote generative model.
#[async_trait]
pub trait ModelClient: Send + Sync {
    fn model_name(&self) -> &str;

    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, ModelError>;
}

/// Builds a [`ModelClient`] during the connection handshake.
#[async_trait]
pub trait ModelConnector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn ModelClient>, ModelError>;
}
