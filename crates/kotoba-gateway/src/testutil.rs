use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use kotoba_model::{GenerationParams, ModelClient, ModelConnector, ModelError};

use crate::config::GatewayConfig;

/// Model client stub: answers with a fixed text, optionally failing from
/// the nth call on.
pub(crate) struct StubClient {
    response: String,
    calls: AtomicUsize,
    errors_from: Option<(usize, ModelError)>,
}

impl StubClient {
    pub(crate) fn ok(response: &str) -> Arc<Self> {
        Arc::new(Self {
            response: response.to_string(),
            calls: AtomicUsize::new(0),
            errors_from: None,
        })
    }

    pub(crate) fn failing(error: ModelError) -> Arc<Self> {
        Self::failing_after(0, error)
    }

    pub(crate) fn failing_after(calls: usize, error: ModelError) -> Arc<Self> {
        Arc::new(Self {
            response: "stub reply".to_string(),
            calls: AtomicUsize::new(0),
            errors_from: Some((calls, error)),
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelClient for StubClient {
    fn model_name(&self) -> &str {
        "stub-model"
    }

    async fn generate(
        &self,
        _prompt: &str,
        _params: &GenerationParams,
    ) -> Result<String, ModelError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some((from, error)) = &self.errors_from {
            if call >= *from {
                return Err(error.clone());
            }
        }
        Ok(self.response.clone())
    }
}

/// Connector stub: plays back scripted connect outcomes, then keeps
/// succeeding with a fresh `StubClient`. Counts handshake attempts.
pub(crate) struct ScriptedConnector {
    attempts: AtomicUsize,
    delay: Duration,
    script: Mutex<VecDeque<Result<Arc<dyn ModelClient>, ModelError>>>,
}

impl ScriptedConnector {
    pub(crate) fn always_ok() -> Arc<Self> {
        Arc::new(Self {
            attempts: AtomicUsize::new(0),
            delay: Duration::ZERO,
            script: Mutex::new(VecDeque::new()),
        })
    }

    pub(crate) fn scripted(
        outcomes: Vec<Result<Arc<dyn ModelClient>, ModelError>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            attempts: AtomicUsize::new(0),
            delay: Duration::ZERO,
            script: Mutex::new(outcomes.into()),
        })
    }

    pub(crate) fn slow(delay: Duration, outcomes: Vec<Result<Arc<dyn ModelClient>, ModelError>>) -> Arc<Self> {
        Arc::new(Self {
            attempts: AtomicUsize::new(0),
            delay,
            script: Mutex::new(outcomes.into()),
        })
    }

    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelConnector for ScriptedConnector {
    async fn connect(&self) -> Result<Arc<dyn ModelClient>, ModelError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(outcome) => outcome,
            None => Ok(StubClient::ok("stub reply")),
        }
    }
}

pub(crate) fn test_config(credentials_path: Option<PathBuf>) -> GatewayConfig {
    GatewayConfig {
        project_id: "kotoba-test".to_string(),
        location: "us-central1".to_string(),
        model_name: "stub-model".to_string(),
        max_output_tokens: 256,
        temperature: 0.0,
        credentials_path,
    }
}

/// An existing file standing in for a service-account key; the manager only
/// checks presence.
pub(crate) fn temp_credentials() -> tempfile::NamedTempFile {
    tempfile::NamedTempFile::new().unwrap()
}
