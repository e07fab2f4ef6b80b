use std::fmt;

use serde::Serialize;

use kotoba_model::ModelError;

const CONFIGURATION_SUGGESTIONS: &[&str] = &[
    "set GOOGLE_APPLICATION_CREDENTIALS to a service account key file",
    "verify the credentials file exists and is readable",
    "confirm the key file is valid service-account JSON",
];

const UNAVAILABLE_SUGGESTIONS: &[&str] = &[
    "confirm the Vertex AI API is enabled for the project",
    "verify the configured project id and location",
    "check that the configured model is available in this region",
];

pub(crate) const PERMISSION_SUGGESTIONS: &[&str] = &[
    "grant the service account the roles/aiplatform.user role",
    "confirm the Vertex AI API is enabled for the project",
    "verify billing is active on the project",
];

/// Closed set of gateway failure kinds. The boundary layer maps each kind
/// to an HTTP status; nothing outside this set ever reaches a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    ServiceUnavailable,
    Upstream,
    Validation,
    RateLimited,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::ServiceUnavailable => "service_unavailable",
            ErrorKind::Upstream => "upstream",
            ErrorKind::Validation => "validation",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::Internal => "internal",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
    pub suggestions: Vec<String>,
}

impl ErrorInfo {
    fn new(kind: ErrorKind, message: impl Into<String>, suggestions: &[&str]) -> Self {
        Self {
            kind,
            message: message.into(),
            suggestions: suggestions.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message, CONFIGURATION_SUGGESTIONS)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::ServiceUnavailable,
            message,
            UNAVAILABLE_SUGGESTIONS,
        )
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message, &[])
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RateLimited, message, &[])
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message, &[])
    }

    pub fn not_ready() -> Self {
        Self::service_unavailable("model connection is not ready")
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)
    }
}

impl std::error::Error for ErrorInfo {}

/// Classify a failure observed while establishing the connection. Total
/// over every [`ModelError`]: anything that is not a credentials problem is
/// an initialization failure, i.e. the service is unavailable.
pub fn classify_handshake(error: &ModelError) -> ErrorInfo {
    match error {
        ModelError::CredentialsMissing { .. } | ModelError::CredentialsInvalid(_) => {
            ErrorInfo::configuration(error.to_string())
        }
        ModelError::Auth(_)
        | ModelError::Network(_)
        | ModelError::ModelNotFound { .. }
        | ModelError::PermissionDenied(_)
        | ModelError::RateLimited(_)
        | ModelError::Upstream { .. }
        | ModelError::EmptyResponse => ErrorInfo::service_unavailable(error.to_string()),
    }
}

/// Classify a failure of a model call made after the connection was ready.
/// Total over every [`ModelError`].
pub fn classify_generation(error: &ModelError) -> ErrorInfo {
    match error {
        ModelError::CredentialsMissing { .. } | ModelError::CredentialsInvalid(_) => {
            ErrorInfo::configuration(error.to_string())
        }
        ModelError::Auth(_) | ModelError::Network(_) => {
            ErrorInfo::service_unavailable(error.to_string())
        }
        ModelError::RateLimited(_) => ErrorInfo::rate_limited(error.to_string()),
        ModelError::PermissionDenied(_) => ErrorInfo::new(
            ErrorKind::Upstream,
            error.to_string(),
            PERMISSION_SUGGESTIONS,
        ),
        ModelError::ModelNotFound { .. }
        | ModelError::Upstream { .. }
        | ModelError::EmptyResponse => {
            ErrorInfo::new(ErrorKind::Upstream, error.to_string(), &[])
        }
    }
}
