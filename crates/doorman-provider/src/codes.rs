//! Data-driven classification of provider error codes.
//!
//! The sign-in flows never inspect code strings themselves; every
//! provider error goes through [`classify_error`] and the flows branch
//! on the closed [`ErrorCode`] enum.

use crate::error::ProviderError;

/// Closed classification of provider failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// No account exists for the identity
    UnknownAccount,
    /// An account exists but the secret was wrong
    WrongCredential,
    /// An account already exists for the identity
    AccountExists,
    /// A federated token failed nonce or expiry verification
    ChallengeFailed,
    /// The request never reached the provider
    Network,
    /// Anything the table does not name
    Other,
}

/// Provider code strings and the classification each maps to.
const CODE_TABLE: &[(&str, ErrorCode)] = &[
    ("user_not_found", ErrorCode::UnknownAccount),
    ("invalid_credentials", ErrorCode::WrongCredential),
    ("invalid_grant", ErrorCode::WrongCredential),
    ("email_exists", ErrorCode::AccountExists),
    ("user_already_exists", ErrorCode::AccountExists),
    ("nonce_mismatch", ErrorCode::ChallengeFailed),
    ("bad_id_token", ErrorCode::ChallengeFailed),
    ("id_token_expired", ErrorCode::ChallengeFailed),
];

fn classify_code(code: &str) -> ErrorCode {
    CODE_TABLE
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, class)| *class)
        .unwrap_or(ErrorCode::Other)
}

/// Classify a provider error for the flows.
///
/// Transport failures are `Network` regardless of any code; API errors
/// classify by their code through the table; codeless API errors and
/// malformed responses are `Other`.
pub fn classify_error(error: &ProviderError) -> ErrorCode {
    match error {
        ProviderError::Transport(_) => ErrorCode::Network,
        ProviderError::Api {
            code: Some(code), ..
        } => classify_code(code),
        ProviderError::Api { code: None, .. } => ErrorCode::Other,
        ProviderError::Malformed(_) | ProviderError::Config(_) => ErrorCode::Other,
    }
}
