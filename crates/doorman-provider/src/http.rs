//! REST client for a GoTrue-style identity provider.

use crate::config::ProviderConfig;
use crate::error::{ProviderError, ProviderResult};
use crate::traits::{IdentityProvider, Session};
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Broker name sent with federated credential exchanges.
const FEDERATED_PROVIDER: &str = "apple";

fn summarize_response_body(body: &str) -> String {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("len={},digest={:016x}", body.len(), hasher.finish())
}

/// Successful token-grant response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    user: UserPayload,
}

#[derive(Debug, Deserialize)]
struct UserPayload {
    id: String,
    #[serde(default)]
    user_metadata: Option<UserMetadata>,
}

#[derive(Debug, Deserialize)]
struct UserMetadata {
    #[serde(default)]
    full_name: Option<String>,
}

/// Non-success response body.
#[derive(Debug, Default, Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default, alias = "error_description", alias = "message")]
    msg: Option<String>,
}

/// `IdentityProvider` implementation over the provider's REST API.
///
/// Holds the access token of the most recent session internally so that
/// `sign_out` can authenticate; flows only ever see the opaque
/// [`Session`].
pub struct HttpProvider {
    http_client: reqwest::Client,
    base_url: String,
    publishable_key: String,
    access_token: Mutex<Option<String>>,
}

impl HttpProvider {
    /// Create a new provider client.
    ///
    /// # Arguments
    /// * `base_url` - The provider project URL (e.g., `https://auth.example.com`)
    /// * `publishable_key` - The publishable API key
    pub fn new(base_url: impl Into<String>, publishable_key: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: base_url.into(),
            publishable_key: publishable_key.into(),
            access_token: Mutex::new(None),
        }
    }

    /// Create a provider client from a validated configuration.
    pub fn from_config(config: &ProviderConfig) -> ProviderResult<Self> {
        let url = config.provider_url()?;
        Ok(Self::new(url.as_str().trim_end_matches('/'), &config.publishable_key))
    }

    /// Build the auth API URL for an endpoint.
    fn auth_url(&self, endpoint: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, endpoint)
    }

    /// Turn a non-success response into an `Api` error, logging a body
    /// summary (never the body itself).
    async fn api_error(endpoint: &str, status: StatusCode, response: reqwest::Response) -> ProviderError {
        let body = response.text().await.unwrap_or_default();
        let payload: ErrorPayload = serde_json::from_str(&body).unwrap_or_default();
        let message = payload
            .msg
            .unwrap_or_else(|| format!("HTTP {status}"));
        warn!(
            endpoint,
            status = status.as_u16(),
            code = payload.error_code.as_deref().unwrap_or("none"),
            body = %summarize_response_body(&body),
            "Provider request rejected"
        );
        ProviderError::Api {
            status: status.as_u16(),
            code: payload.error_code,
            message,
        }
    }

    /// POST a token-issuing request and store the session's access token.
    async fn token_request(
        &self,
        endpoint: &str,
        body: serde_json::Value,
    ) -> ProviderResult<Session> {
        let response = self
            .http_client
            .post(self.auth_url(endpoint))
            .header("apikey", &self.publishable_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::api_error(endpoint, status, response).await);
        }

        let data: TokenResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        *self.access_token.lock().unwrap() = Some(data.access_token);

        Ok(Session {
            user_id: data.user.id,
            display_name: data.user.user_metadata.and_then(|m| m.full_name),
        })
    }

    /// POST a request whose success response carries no session.
    async fn plain_request(&self, endpoint: &str, body: serde_json::Value) -> ProviderResult<()> {
        let response = self
            .http_client
            .post(self.auth_url(endpoint))
            .header("apikey", &self.publishable_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::api_error(endpoint, status, response).await);
        }
        Ok(())
    }
}

impl IdentityProvider for HttpProvider {
    async fn sign_in(&self, email: &str, password: &str) -> ProviderResult<Session> {
        debug!(email = %email, "Signing in with password");
        let session = self
            .token_request(
                "token?grant_type=password",
                serde_json::json!({
                    "email": email,
                    "password": password,
                }),
            )
            .await?;
        info!(user_id = %session.user_id, "Password sign-in succeeded");
        Ok(session)
    }

    async fn create_account(&self, email: &str, password: &str) -> ProviderResult<Session> {
        debug!(email = %email, "Creating account");
        let session = self
            .token_request(
                "signup",
                serde_json::json!({
                    "email": email,
                    "password": password,
                }),
            )
            .await?;
        info!(user_id = %session.user_id, "Account created");
        Ok(session)
    }

    async fn exchange_federated_credential(
        &self,
        identity_token: &str,
        raw_nonce: &str,
        display_name: Option<&str>,
    ) -> ProviderResult<Session> {
        debug!(
            provider = FEDERATED_PROVIDER,
            has_display_name = display_name.is_some(),
            "Exchanging federated credential"
        );
        let mut body = serde_json::json!({
            "provider": FEDERATED_PROVIDER,
            "id_token": identity_token,
            "nonce": raw_nonce,
        });
        if let Some(name) = display_name {
            body["data"] = serde_json::json!({ "full_name": name });
        }
        let session = self.token_request("token?grant_type=id_token", body).await?;
        info!(user_id = %session.user_id, "Federated sign-in succeeded");
        Ok(session)
    }

    async fn sign_out(&self) -> ProviderResult<()> {
        // Take the token first: the local session ends even if the
        // remote call fails.
        let token = self.access_token.lock().unwrap().take();
        let Some(token) = token else {
            debug!("No provider session to sign out");
            return Ok(());
        };

        let response = self
            .http_client
            .post(self.auth_url("logout"))
            .header("apikey", &self.publishable_key)
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::api_error("logout", status, response).await);
        }
        info!("Signed out");
        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> ProviderResult<()> {
        debug!(email = %email, "Requesting password reset");
        self.plain_request("recover", serde_json::json!({ "email": email }))
            .await
    }
}
