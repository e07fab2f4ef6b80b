use std::path::PathBuf;
use std::str::FromStr;

use serde::Serialize;

use crate::error::ErrorInfo;

const DEFAULT_PROJECT_ID: &str = "kotoba-dev";
const DEFAULT_LOCATION: &str = "us-central1";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 1024;
const DEFAULT_TEMPERATURE: f32 = 0.4;

/// Connection parameters, resolved once at startup and never mutated.
///
/// A missing credentials path is not an error here: only the first
/// `ensure_ready` needs it, and deferring the check lets the operator fix
/// the environment and retry without a restart.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub project_id: String,
    pub location: String,
    pub model_name: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub credentials_path: Option<PathBuf>,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ErrorInfo> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ErrorInfo>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Ok(Self {
            project_id: get("KOTOBA_PROJECT_ID")
                .unwrap_or_else(|| DEFAULT_PROJECT_ID.to_string()),
            location: get("KOTOBA_LOCATION").unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
            model_name: get("KOTOBA_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_output_tokens: parse_or(
                get("KOTOBA_MAX_OUTPUT_TOKENS"),
                "KOTOBA_MAX_OUTPUT_TOKENS",
                DEFAULT_MAX_OUTPUT_TOKENS,
            )?,
            temperature: parse_or(
                get("KOTOBA_TEMPERATURE"),
                "KOTOBA_TEMPERATURE",
                DEFAULT_TEMPERATURE,
            )?,
            credentials_path: get("GOOGLE_APPLICATION_CREDENTIALS").map(PathBuf::from),
        })
    }

    pub fn view(&self) -> GatewayConfigView {
        GatewayConfigView {
            project_id: self.project_id.clone(),
            location: self.location.clone(),
            model: self.model_name.clone(),
            max_output_tokens: self.max_output_tokens,
            temperature: self.temperature,
            credentials_configured: self.credentials_path.is_some(),
        }
    }
}

/// Read-only echo of the non-secret configuration, embedded in status
/// snapshots.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfigView {
    pub project_id: String,
    pub location: String,
    pub model: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub credentials_configured: bool,
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> Result<T, ErrorInfo>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|err| {
            ErrorInfo::configuration(format!("invalid {key} value {value:?}: {err}"))
        }),
    }
}
