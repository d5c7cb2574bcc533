//! Terminal outcomes and their user-facing messages.

use doorman_provider::{classify_error, ErrorCode, ProviderError};
use serde::{Deserialize, Serialize};

/// Default user-facing messages, kept in one place so presentation and
/// tests agree on exact wording.
pub mod messages {
    pub const EMAIL_REQUIRED: &str = "Email is required.";
    pub const PASSWORD_REQUIRED: &str = "Password is required.";
    pub const NETWORK_UNAVAILABLE: &str = "Check your internet connection.";
    pub const UNKNOWN_ACCOUNT: &str = "No account found for this email.";
    pub const WRONG_CREDENTIAL: &str = "Incorrect password.";
    pub const SIGN_IN_FAILED: &str = "Sign-in failed. Try again.";
    pub const REGISTRATION_FAILED: &str = "Could not create the account. Try again.";
    pub const FEDERATED_CANCELLED: &str = "Sign-in was cancelled.";
    pub const FEDERATED_BROKER_FAILED: &str = "The identity service could not complete sign-in.";
    pub const FEDERATED_CHALLENGE_FAILED: &str = "Sign-in expired. Try again.";
    pub const SIGN_OUT_FAILED: &str = "Could not sign out of the account service.";
}

/// Input field a failure should surface on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureField {
    Email,
    Password,
    General,
}

/// User-facing failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    /// A required field was empty; resolved without any remote call
    RequiredField,
    /// The provider could not be reached
    NetworkUnavailable,
    /// No account exists for the entered email
    UnknownAccount,
    /// The account exists but the password was wrong
    WrongCredential,
    /// Anything else
    GenericFailure,
}

/// A categorized failure with the message presentation should show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureNotice {
    pub category: FailureCategory,
    pub field: FailureField,
    pub message: String,
}

impl FailureNotice {
    pub fn new(
        category: FailureCategory,
        field: FailureField,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            field,
            message: message.into(),
        }
    }
}

/// Terminal event for one sign-in or registration attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum AuthOutcome {
    Success,
    Failure(FailureNotice),
}

impl AuthOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AuthOutcome::Success)
    }
}

/// Map a provider error from a sign-in call onto the failure the user
/// should see.
pub(crate) fn sign_in_failure_notice(error: &ProviderError) -> FailureNotice {
    match classify_error(error) {
        ErrorCode::Network => FailureNotice::new(
            FailureCategory::NetworkUnavailable,
            FailureField::Email,
            messages::NETWORK_UNAVAILABLE,
        ),
        ErrorCode::UnknownAccount => FailureNotice::new(
            FailureCategory::UnknownAccount,
            FailureField::Email,
            messages::UNKNOWN_ACCOUNT,
        ),
        ErrorCode::WrongCredential => FailureNotice::new(
            FailureCategory::WrongCredential,
            FailureField::Password,
            messages::WRONG_CREDENTIAL,
        ),
        _ => FailureNotice::new(
            FailureCategory::GenericFailure,
            FailureField::General,
            messages::SIGN_IN_FAILED,
        ),
    }
}

/// Map a provider error from an account-creation call.
///
/// Account-exists never reaches here; the registration flow intercepts
/// it for the sign-in fallback first.
pub(crate) fn registration_failure_notice(error: &ProviderError) -> FailureNotice {
    match classify_error(error) {
        ErrorCode::Network => FailureNotice::new(
            FailureCategory::NetworkUnavailable,
            FailureField::Email,
            messages::NETWORK_UNAVAILABLE,
        ),
        _ => FailureNotice::new(
            FailureCategory::GenericFailure,
            FailureField::Email,
            messages::REGISTRATION_FAILED,
        ),
    }
}

/// Terminal event for one federated sign-in attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum FederatedOutcome {
    Success,
    Failed(FederatedFailure),
}

/// A categorized federated failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederatedFailure {
    pub kind: FederatedFailureKind,
    pub message: String,
}

/// Where a federated attempt came apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FederatedFailureKind {
    /// The user dismissed the broker's authorization UI
    Cancelled,
    /// The broker reported an error
    Broker,
    /// The provider rejected the nonce or token
    Challenge,
    /// The provider could not be reached
    Network,
    /// Any other provider rejection
    Provider,
}

impl FederatedOutcome {
    pub(crate) fn failed(kind: FederatedFailureKind, message: impl Into<String>) -> Self {
        FederatedOutcome::Failed(FederatedFailure {
            kind,
            message: message.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(code: &str) -> ProviderError {
        ProviderError::Api {
            status: 400,
            code: Some(code.to_string()),
            message: String::new(),
        }
    }

    #[test]
    fn unknown_account_surfaces_on_email_field() {
        let notice = sign_in_failure_notice(&api_error("user_not_found"));
        assert_eq!(notice.category, FailureCategory::UnknownAccount);
        assert_eq!(notice.field, FailureField::Email);
        assert_eq!(notice.message, messages::UNKNOWN_ACCOUNT);
    }

    #[test]
    fn wrong_credential_surfaces_on_password_field() {
        let notice = sign_in_failure_notice(&api_error("invalid_credentials"));
        assert_eq!(notice.category, FailureCategory::WrongCredential);
        assert_eq!(notice.field, FailureField::Password);
    }

    #[test]
    fn unrecognized_codes_surface_generically() {
        let notice = sign_in_failure_notice(&api_error("weak_password"));
        assert_eq!(notice.category, FailureCategory::GenericFailure);
        assert_eq!(notice.field, FailureField::General);
        assert_eq!(notice.message, messages::SIGN_IN_FAILED);
    }

    #[test]
    fn registration_errors_surface_on_email_field() {
        let notice = registration_failure_notice(&api_error("weak_password"));
        assert_eq!(notice.category, FailureCategory::GenericFailure);
        assert_eq!(notice.field, FailureField::Email);
        assert_eq!(notice.message, messages::REGISTRATION_FAILED);
    }

    #[test]
    fn outcome_serializes_with_result_tag() {
        let success = serde_json::to_value(AuthOutcome::Success).unwrap();
        assert_eq!(success["result"], "success");

        let failure = AuthOutcome::Failure(FailureNotice::new(
            FailureCategory::WrongCredential,
            FailureField::Password,
            messages::WRONG_CREDENTIAL,
        ));
        let failure = serde_json::to_value(failure).unwrap();
        assert_eq!(failure["result"], "failure");
        assert_eq!(failure["category"], "wrong_credential");
        assert_eq!(failure["field"], "password");
    }
}
