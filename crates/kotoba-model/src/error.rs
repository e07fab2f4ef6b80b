use thiserror::Error;

/// Failure of the upstream model capability, tagged at the point the
/// failure is observed. Downstream classification works on these variants,
/// never on message text.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    #[error("credentials file not found: {path}")]
    CredentialsMissing { path: String },

    #[error("invalid service account credentials: {0}")]
    CredentialsInvalid(String),

    #[error("token exchange failed: {0}")]
    Auth(String),

    #[error("network error calling the model service: {0}")]
    Network(String),

    #[error("model {model} not found")]
    ModelNotFound { model: String },

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("rate limited by the model service: {0}")]
    RateLimited(String),

    #[error("model service returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("model returned no text")]
    EmptyResponse,
}
