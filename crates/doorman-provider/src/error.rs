//! Provider and broker error types.

use thiserror::Error;

/// Error type for identity-provider calls.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The request never produced an HTTP response
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The provider answered with a non-success status
    #[error("Provider rejected the request (HTTP {status}): {message}")]
    Api {
        status: u16,
        /// Provider-defined error code, when the body carried one
        code: Option<String>,
        message: String,
    },

    /// A success response whose body did not match the expected shape
    #[error("Malformed provider response: {0}")]
    Malformed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ProviderError {
    /// Returns true if this error is transient and the user can simply
    /// retry.
    ///
    /// Transient errors include connection failures, timeouts, and 5xx
    /// provider responses.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Transport(e) => e.is_connect() || e.is_timeout(),
            ProviderError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Result type alias using ProviderError.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Error reported by a federated broker's authorization UI.
///
/// Broker SDKs are opaque third parties; their failures carry only a
/// description.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Broker error: {0}")]
pub struct BrokerError(pub String);
