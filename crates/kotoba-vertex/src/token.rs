use std::time::{Duration, SystemTime};

use http::header::CONTENT_TYPE;
use http::HeaderValue;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use kotoba_model::ModelError;

use crate::credentials::ServiceAccountKey;

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: u64 = 3600;
// Refresh this long before the upstream expiry to avoid using a token that
// dies mid-request.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
struct Claims {
    iss: String,
    scope: &'static str,
    aud: &'static str,
    iat: u64,
    exp: u64,
}

#[derive(Serialize)]
struct TokenRequest {
    grant_type: &'static str,
    assertion: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: SystemTime,
}

impl CachedToken {
    fn fresh(&self) -> bool {
        SystemTime::now() + EXPIRY_MARGIN < self.expires_at
    }
}

/// Exchanges service-account assertions for access tokens and caches the
/// result until shortly before expiry.
pub struct TokenProvider {
    client_email: String,
    encoding_key: EncodingKey,
    http: wreq::Client,
    cached: RwLock<Option<CachedToken>>,
}

impl TokenProvider {
    pub fn new(key: &ServiceAccountKey, http: wreq::Client) -> Result<Self, ModelError> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|err| ModelError::CredentialsInvalid(err.to_string()))?;
        Ok(Self {
            client_email: key.client_email.clone(),
            encoding_key,
            http,
            cached: RwLock::new(None),
        })
    }

    pub async fn access_token(&self) -> Result<String, ModelError> {
        {
            let guard = self.cached.read().await;
            if let Some(cached) = guard.as_ref() {
                if cached.fresh() {
                    return Ok(cached.token.clone());
                }
            }
        }

        let mut guard = self.cached.write().await;
        // Another caller may have refreshed while we waited for the lock.
        if let Some(cached) = guard.as_ref() {
            if cached.fresh() {
                return Ok(cached.token.clone());
            }
        }

        let cached = self.exchange().await?;
        let token = cached.token.clone();
        *guard = Some(cached);
        Ok(token)
    }

    async fn exchange(&self) -> Result<CachedToken, ModelError> {
        let assertion = self.assertion()?;
        let request = TokenRequest {
            grant_type: GRANT_TYPE,
            assertion,
        };
        let response = self
            .http
            .post(TOKEN_URL)
            .header(
                CONTENT_TYPE,
                HeaderValue::from_static("application/x-www-form-urlencoded"),
            )
            .form(&request)
            .send()
            .await
            .map_err(|err| ModelError::Network(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Auth(format!("{status}: {body}")));
        }

        let payload = response
            .json::<TokenResponse>()
            .await
            .map_err(|err| ModelError::Auth(err.to_string()))?;
        let token = payload
            .access_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ModelError::Auth("token response had no access_token".to_string()))?;
        let expires_in = payload.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS);
        debug!(expires_in, "access token refreshed");

        Ok(CachedToken {
            token,
            expires_at: SystemTime::now() + Duration::from_secs(expires_in),
        })
    }

    fn assertion(&self) -> Result<String, ModelError> {
        let iat = jsonwebtoken::get_current_timestamp();
        let claims = Claims {
            iss: self.client_email.clone(),
            scope: SCOPE,
            aud: TOKEN_URL,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };
        encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|err| ModelError::Auth(err.to_string()))
    }
}
