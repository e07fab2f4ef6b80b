use serde::{Deserialize, Serialize};

/// Error envelope returned by Google APIs on non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,
    #[serde(default)]
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl ErrorBody {
    /// Upstream error message out of a raw body, when the body is the
    /// standard Google error envelope.
    pub fn message_from(body: &str) -> Option<String> {
        let parsed: ErrorBody = serde_json::from_str(body).ok()?;
        if parsed.error.message.is_empty() {
            None
        } else {
            Some(parsed.error.message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_message_from_error_envelope() {
        let body = r#"{
            "error": {
                "code": 403,
                "message": "Permission denied on resource project kotoba-dev.",
                "status": "PERMISSION_DENIED"
            }
        }"#;
        assert_eq!(
            ErrorBody::message_from(body).as_deref(),
            Some("Permission denied on resource project kotoba-dev.")
        );
    }

    #[test]
    fn falls_back_on_non_envelope_bodies() {
        assert!(ErrorBody::message_from("upstream exploded").is_none());
        assert!(ErrorBody::message_from(r#"{"error":{"message":""}}"#).is_none());
    }
}
