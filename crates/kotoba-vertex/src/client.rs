use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use http::header::AUTHORIZATION;
use http::StatusCode;
use tracing::debug;

use kotoba_model::{GenerationParams, ModelClient, ModelConnector, ModelError};
use kotoba_protocol::generate_content::GenerationConfig;
use kotoba_protocol::{ErrorBody, GenerateContentRequest, GenerateContentResponse};

use crate::credentials::ServiceAccountKey;
use crate::token::TokenProvider;

#[derive(Debug, Clone)]
pub struct VertexSettings {
    pub project_id: String,
    pub location: String,
    pub model: String,
    pub credentials_path: Option<PathBuf>,
}

pub struct VertexClient {
    model: String,
    endpoint: String,
    tokens: TokenProvider,
    http: wreq::Client,
}

impl VertexClient {
    pub fn new(settings: &VertexSettings, key: ServiceAccountKey) -> Result<Self, ModelError> {
        let http = wreq::Client::new();
        let tokens = TokenProvider::new(&key, http.clone())?;
        Ok(Self {
            model: settings.model.clone(),
            endpoint: endpoint_url(settings),
            tokens,
            http,
        })
    }
}

#[async_trait]
impl ModelClient for VertexClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, ModelError> {
        let token = self.tokens.access_token().await?;
        let body = GenerateContentRequest::user_text(
            prompt,
            Some(GenerationConfig {
                temperature: Some(params.temperature),
                max_output_tokens: Some(params.max_output_tokens),
            }),
        );

        let response = self
            .http
            .post(&self.endpoint)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .json(&body)
            .send()
            .await
            .map_err(|err| ModelError::Network(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_for_status(status, &body, &self.model));
        }

        let payload = response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|err| ModelError::Network(err.to_string()))?;
        debug!(model = %self.model, "generation completed");
        payload.primary_text().ok_or(ModelError::EmptyResponse)
    }
}

pub struct VertexConnector {
    settings: VertexSettings,
}

impl VertexConnector {
    pub fn new(settings: VertexSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl ModelConnector for VertexConnector {
    async fn connect(&self) -> Result<Arc<dyn ModelClient>, ModelError> {
        let path = self.settings.credentials_path.as_deref().ok_or_else(|| {
            ModelError::CredentialsMissing {
                path: "(unset)".to_string(),
            }
        })?;
        let key = ServiceAccountKey::load(path)?;
        let client = VertexClient::new(&self.settings, key)?;
        Ok(Arc::new(client))
    }
}

fn endpoint_url(settings: &VertexSettings) -> String {
    format!(
        "https://{location}-aiplatform.googleapis.com/v1/projects/{project}/locations/{location}/publishers/google/models/{model}:generateContent",
        location = settings.location,
        project = settings.project_id,
        model = settings.model,
    )
}

fn error_for_status(status: StatusCode, body: &str, model: &str) -> ModelError {
    let message = ErrorBody::message_from(body)
        .unwrap_or_else(|| truncated(body));
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ModelError::PermissionDenied(message)
        }
        StatusCode::NOT_FOUND => ModelError::ModelNotFound {
            model: model.to_string(),
        },
        StatusCode::TOO_MANY_REQUESTS => ModelError::RateLimited(message),
        _ => ModelError::Upstream {
            status: status.as_u16(),
            message,
        },
    }
}

fn truncated(body: &str) -> String {
    const LIMIT: usize = 256;
    if body.len() <= LIMIT {
        body.to_string()
    } else {
        let cut = body
            .char_indices()
            .take_while(|(idx, _)| *idx < LIMIT)
            .last()
            .map(|(idx, ch)| idx + ch.len_utf8())
            .unwrap_or(0);
        format!("{}...", &body[..cut])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> VertexSettings {
        VertexSettings {
            project_id: "kotoba-dev".to_string(),
            location: "asia-northeast1".to_string(),
            model: "gemini-2.0-flash".to_string(),
            credentials_path: Some(PathBuf::from("/tmp/key.json")),
        }
    }

    #[test]
    fn endpoint_includes_project_location_and_model() {
        let url = endpoint_url(&settings());
        assert_eq!(
            url,
            "https://asia-northeast1-aiplatform.googleapis.com/v1/projects/kotoba-dev/locations/asia-northeast1/publishers/google/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn status_mapping_tags_failures_at_the_source() {
        let denied = error_for_status(StatusCode::FORBIDDEN, "{}", "gemini-2.0-flash");
        assert!(matches!(denied, ModelError::PermissionDenied(_)));

        let missing = error_for_status(StatusCode::NOT_FOUND, "{}", "gemini-2.0-flash");
        assert!(matches!(
            missing,
            ModelError::ModelNotFound { model } if model == "gemini-2.0-flash"
        ));

        let limited = error_for_status(StatusCode::TOO_MANY_REQUESTS, "{}", "gemini-2.0-flash");
        assert!(matches!(limited, ModelError::RateLimited(_)));

        let upstream = error_for_status(StatusCode::BAD_GATEWAY, "boom", "gemini-2.0-flash");
        assert!(matches!(
            upstream,
            ModelError::Upstream { status: 502, .. }
        ));
    }

    #[test]
    fn status_mapping_prefers_the_error_envelope_message() {
        let body = r#"{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#;
        match error_for_status(StatusCode::TOO_MANY_REQUESTS, body, "gemini-2.0-flash") {
            ModelError::RateLimited(message) => assert_eq!(message, "Quota exceeded"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
