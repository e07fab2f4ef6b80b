use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, warn};

use kotoba_model::{GenerationParams, ModelClient, ModelConnector, ModelError};

use crate::config::{GatewayConfig, GatewayConfigView};
use crate::error::{classify_generation, classify_handshake, ErrorInfo, PERMISSION_SUGGESTIONS};

pub(crate) const PROBE_PROMPT: &str = "ping";

type HandshakeOutcome = Result<Arc<dyn ModelClient>, ErrorInfo>;

/// `Uninitialized -> Initializing -> {Ready, Failed}`; `Failed` re-enters
/// `Initializing` on the next `ensure_ready`. There is no way back to
/// `Uninitialized`.
enum ConnectionState {
    Uninitialized,
    Initializing(watch::Receiver<Option<HandshakeOutcome>>),
    Ready(Arc<dyn ModelClient>),
    Failed(ErrorInfo),
}

/// Owns the single shared handle to the remote model.
///
/// The handshake is expensive, so arbitrarily many concurrent callers must
/// collapse onto one attempt: the first caller to observe a non-ready state
/// claims the transition and spawns the handshake; everyone else awaits the
/// same broadcast outcome. The spawned task also keeps the handshake running
/// to completion when the claiming caller disconnects mid-flight.
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

struct Inner {
    config: GatewayConfig,
    connector: Arc<dyn ModelConnector>,
    state: Mutex<ConnectionState>,
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, ConnectionState> {
        // State writes are plain assignments; a poisoned guard still holds a
        // consistent value.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub initialized: bool,
    pub initializing: bool,
    pub error_message: Option<String>,
    pub config: GatewayConfigView,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionReport {
    pub has_permissions: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub suggestions: Vec<String>,
}

impl ConnectionManager {
    pub fn new(config: GatewayConfig, connector: Arc<dyn ModelConnector>) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                connector,
                state: Mutex::new(ConnectionState::Uninitialized),
            }),
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.inner.config
    }

    /// Returns the shared client handle, establishing the connection on
    /// first use. Idempotent once `Ready`; a `Failed` state is retried.
    pub async fn ensure_ready(&self) -> HandshakeOutcome {
        let mut rx = {
            let mut state = self.inner.lock_state();
            match &*state {
                ConnectionState::Ready(client) => return Ok(client.clone()),
                ConnectionState::Initializing(rx) => rx.clone(),
                ConnectionState::Uninitialized | ConnectionState::Failed(_) => {
                    let (tx, rx) = watch::channel(None);
                    *state = ConnectionState::Initializing(rx.clone());
                    self.spawn_handshake(tx);
                    rx
                }
            }
        };

        loop {
            let outcome = rx.borrow_and_update().clone();
            if let Some(outcome) = outcome {
                return outcome;
            }
            if rx.changed().await.is_err() {
                return Err(ErrorInfo::internal(
                    "initialization task dropped before completing",
                ));
            }
        }
    }

    fn spawn_handshake(&self, tx: watch::Sender<Option<HandshakeOutcome>>) {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            info!(model = %inner.config.model_name, "establishing model connection");
            let outcome = run_handshake(&inner).await;
            {
                let mut state = inner.lock_state();
                *state = match &outcome {
                    Ok(client) => ConnectionState::Ready(client.clone()),
                    Err(err) => ConnectionState::Failed(err.clone()),
                };
            }
            match &outcome {
                Ok(client) => info!(model = client.model_name(), "model connection ready"),
                Err(err) => warn!(kind = err.kind.as_str(), error = %err.message, "model connection failed"),
            }
            let _ = tx.send(Some(outcome));
        });
    }

    /// Current state without waiting on any in-flight handshake.
    pub fn status(&self) -> StatusSnapshot {
        let state = self.inner.lock_state();
        let (initialized, initializing, error_message) = match &*state {
            ConnectionState::Uninitialized => (false, false, None),
            ConnectionState::Initializing(_) => (false, true, None),
            ConnectionState::Ready(_) => (true, false, None),
            ConnectionState::Failed(err) => (false, false, Some(err.message.clone())),
        };
        StatusSnapshot {
            initialized,
            initializing,
            error_message,
            config: self.inner.config.view(),
        }
    }

    /// One diagnostic call confirming the connection may use the model.
    /// A permission denial is a report, not a failure; any state other than
    /// `Ready` is.
    pub async fn check_permissions(&self) -> Result<PermissionReport, ErrorInfo> {
        let client = {
            let state = self.inner.lock_state();
            match &*state {
                ConnectionState::Ready(client) => client.clone(),
                _ => return Err(ErrorInfo::not_ready()),
            }
        };

        match client.generate(PROBE_PROMPT, &GenerationParams::probe()).await {
            Ok(_) => Ok(PermissionReport {
                has_permissions: true,
                error: None,
                suggestions: Vec::new(),
            }),
            Err(ModelError::PermissionDenied(message)) => Ok(PermissionReport {
                has_permissions: false,
                error: Some(message),
                suggestions: PERMISSION_SUGGESTIONS
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            }),
            Err(other) => Err(classify_generation(&other)),
        }
    }
}

async fn run_handshake(inner: &Inner) -> HandshakeOutcome {
    let path = match inner.config.credentials_path.as_deref() {
        Some(path) => path,
        None => {
            return Err(ErrorInfo::configuration(
                "GOOGLE_APPLICATION_CREDENTIALS is not set",
            ));
        }
    };
    if !path.exists() {
        let missing = ModelError::CredentialsMissing {
            path: path.display().to_string(),
        };
        return Err(classify_handshake(&missing));
    }

    let client = inner
        .connector
        .connect()
        .await
        .map_err(|err| classify_handshake(&err))?;

    // Confirms reachability and that the configured model name is valid.
    client
        .generate(PROBE_PROMPT, &GenerationParams::probe())
        .await
        .map_err(|err| classify_handshake(&err))?;

    Ok(client)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::error::ErrorKind;
    use crate::testutil::{temp_credentials, test_config, ScriptedConnector, StubClient};

    #[tokio::test]
    async fn status_before_any_initialization() {
        let connector = ScriptedConnector::always_ok();
        let manager = ConnectionManager::new(test_config(None), connector);

        let snapshot = manager.status();
        assert!(!snapshot.initialized);
        assert!(!snapshot.initializing);
        assert!(snapshot.error_message.is_none());
        assert_eq!(snapshot.config.model, "stub-model");
    }

    #[tokio::test]
    async fn missing_credentials_path_is_a_configuration_error() {
        let connector = ScriptedConnector::always_ok();
        let manager = ConnectionManager::new(test_config(None), connector.clone());

        let err = manager.ensure_ready().await.err().unwrap();
        assert_eq!(err.kind, ErrorKind::Configuration);
        assert_eq!(connector.attempts(), 0);
    }

    #[tokio::test]
    async fn nonexistent_credentials_file_names_the_path() {
        let connector = ScriptedConnector::always_ok();
        let path = std::path::PathBuf::from("/nonexistent/kotoba/key.json");
        let manager = ConnectionManager::new(test_config(Some(path)), connector.clone());

        let err = manager.ensure_ready().await.err().unwrap();
        assert_eq!(err.kind, ErrorKind::Configuration);
        assert!(err.message.contains("/nonexistent/kotoba/key.json"));
        assert!(!err.suggestions.is_empty());
        assert_eq!(connector.attempts(), 0);
    }

    #[tokio::test]
    async fn single_flight_under_concurrent_callers() {
        let creds = temp_credentials();
        let connector = ScriptedConnector::slow(Duration::from_millis(50), Vec::new());
        let manager = Arc::new(ConnectionManager::new(
            test_config(Some(creds.path().to_path_buf())),
            connector.clone(),
        ));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let manager = manager.clone();
            handles.push(tokio::spawn(async move { manager.ensure_ready().await }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        assert_eq!(connector.attempts(), 1);
        assert!(manager.status().initialized);
    }

    #[tokio::test]
    async fn concurrent_callers_share_a_failed_outcome() {
        let creds = temp_credentials();
        let outcome: Result<Arc<dyn kotoba_model::ModelClient>, kotoba_model::ModelError> =
            Err(kotoba_model::ModelError::Network("connection refused".to_string()));
        let connector = ScriptedConnector::slow(Duration::from_millis(20), vec![outcome]);
        let manager = Arc::new(ConnectionManager::new(
            test_config(Some(creds.path().to_path_buf())),
            connector.clone(),
        ));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let manager = manager.clone();
            handles.push(tokio::spawn(async move { manager.ensure_ready().await }));
        }
        for handle in handles {
            let err = handle.await.unwrap().err().unwrap();
            assert_eq!(err.kind, ErrorKind::ServiceUnavailable);
            assert!(err.message.contains("connection refused"));
        }

        assert_eq!(connector.attempts(), 1);
    }

    #[tokio::test]
    async fn ready_state_is_idempotent() {
        let creds = temp_credentials();
        let connector = ScriptedConnector::always_ok();
        let manager = ConnectionManager::new(
            test_config(Some(creds.path().to_path_buf())),
            connector.clone(),
        );

        assert!(manager.ensure_ready().await.is_ok());
        assert!(manager.ensure_ready().await.is_ok());
        assert!(manager.ensure_ready().await.is_ok());
        assert_eq!(connector.attempts(), 1);
    }

    #[tokio::test]
    async fn failed_state_retries_and_recovers() {
        let creds = temp_credentials();
        let outcome: Result<Arc<dyn kotoba_model::ModelClient>, kotoba_model::ModelError> =
            Err(kotoba_model::ModelError::Network("dns failure".to_string()));
        let connector = ScriptedConnector::scripted(vec![outcome]);
        let manager = ConnectionManager::new(
            test_config(Some(creds.path().to_path_buf())),
            connector.clone(),
        );

        let err = manager.ensure_ready().await.err().unwrap();
        assert_eq!(err.kind, ErrorKind::ServiceUnavailable);
        let snapshot = manager.status();
        assert!(!snapshot.initialized);
        assert!(snapshot.error_message.is_some());

        // Next call runs a fresh handshake, which now succeeds.
        assert!(manager.ensure_ready().await.is_ok());
        assert!(manager.status().initialized);
        assert_eq!(connector.attempts(), 2);
    }

    #[tokio::test]
    async fn probe_failure_during_handshake_marks_failed() {
        let creds = temp_credentials();
        let stub = StubClient::failing(kotoba_model::ModelError::ModelNotFound {
            model: "stub-model".to_string(),
        });
        let outcome: Result<Arc<dyn kotoba_model::ModelClient>, kotoba_model::ModelError> =
            Ok(stub);
        let connector = ScriptedConnector::scripted(vec![outcome]);
        let manager = ConnectionManager::new(
            test_config(Some(creds.path().to_path_buf())),
            connector.clone(),
        );

        let err = manager.ensure_ready().await.err().unwrap();
        assert_eq!(err.kind, ErrorKind::ServiceUnavailable);
        assert_eq!(connector.attempts(), 1);
    }

    #[tokio::test]
    async fn check_permissions_requires_ready() {
        let connector = ScriptedConnector::always_ok();
        let manager = ConnectionManager::new(test_config(None), connector);

        let err = manager.check_permissions().await.err().unwrap();
        assert_eq!(err.kind, ErrorKind::ServiceUnavailable);
    }

    #[tokio::test]
    async fn check_permissions_reports_a_denial_instead_of_failing() {
        let creds = temp_credentials();
        // First call (the handshake probe) succeeds, later calls are denied.
        let stub = StubClient::failing_after(
            1,
            kotoba_model::ModelError::PermissionDenied("caller lacks predict".to_string()),
        );
        let outcome: Result<Arc<dyn kotoba_model::ModelClient>, kotoba_model::ModelError> =
            Ok(stub.clone());
        let connector = ScriptedConnector::scripted(vec![outcome]);
        let manager = ConnectionManager::new(
            test_config(Some(creds.path().to_path_buf())),
            connector,
        );

        assert!(manager.ensure_ready().await.is_ok());
        let report = manager.check_permissions().await.unwrap();
        assert!(!report.has_permissions);
        assert!(report.error.as_deref().is_some_and(|e| e.contains("predict")));
        assert!(!report.suggestions.is_empty());
        assert_eq!(stub.calls(), 2);
    }

    #[tokio::test]
    async fn check_permissions_passes_when_the_probe_succeeds() {
        let creds = temp_credentials();
        let connector = ScriptedConnector::always_ok();
        let manager = ConnectionManager::new(
            test_config(Some(creds.path().to_path_buf())),
            connector,
        );

        assert!(manager.ensure_ready().await.is_ok());
        let report = manager.check_permissions().await.unwrap();
        assert!(report.has_permissions);
        assert!(report.error.is_none());
        assert!(report.suggestions.is_empty());
    }
}
