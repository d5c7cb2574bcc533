//! Provider and broker interfaces.

use crate::error::{BrokerError, ProviderResult};
use serde::{Deserialize, Serialize};

/// Authenticated-user handle returned by the provider.
///
/// Token material and expiry stay inside the provider implementation;
/// only identity display data crosses this boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    /// Provider-assigned user id
    pub user_id: String,
    /// Display name when the provider or broker supplied one
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Remote identity provider verifying credentials and issuing sessions.
#[allow(async_fn_in_trait)]
pub trait IdentityProvider: Send + Sync {
    /// Verify an email/password pair.
    async fn sign_in(&self, email: &str, password: &str) -> ProviderResult<Session>;

    /// Create a new account with an email/password pair.
    async fn create_account(&self, email: &str, password: &str) -> ProviderResult<Session>;

    /// Exchange a broker identity token for a provider session.
    ///
    /// `raw_nonce` is the unhashed value the token was issued against;
    /// the provider verifies it against the nonce embedded in the token.
    async fn exchange_federated_credential(
        &self,
        identity_token: &str,
        raw_nonce: &str,
        display_name: Option<&str>,
    ) -> ProviderResult<Session>;

    /// Terminate the provider-side session.
    async fn sign_out(&self) -> ProviderResult<()>;

    /// Ask the provider to send a password-reset message.
    async fn send_password_reset(&self, email: &str) -> ProviderResult<()>;
}

/// What the broker's authorization UI produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerAuthorization {
    /// The user completed authorization. The token embeds the hashed
    /// challenge it was requested with.
    Authorized {
        identity_token: String,
        /// Full name, when the requested scope was granted
        display_name: Option<String>,
    },
    /// The user dismissed the authorization UI.
    Cancelled,
}

/// Identity scopes requested from the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerScope {
    FullName,
    Email,
}

/// Third-party federated identity broker.
#[allow(async_fn_in_trait)]
pub trait FederatedBroker: Send + Sync {
    /// Present the broker's authorization UI and wait for its result.
    ///
    /// Only the hashed challenge crosses this boundary; the raw nonce
    /// never does.
    async fn authorize(
        &self,
        hashed_challenge: &str,
        scopes: &[BrokerScope],
    ) -> Result<BrokerAuthorization, BrokerError>;
}
