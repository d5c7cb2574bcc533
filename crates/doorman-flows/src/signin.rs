//! Password sign-in flow.

use crate::attempt::AttemptGuard;
use crate::outcome::{
    messages, sign_in_failure_notice, AuthOutcome, FailureCategory, FailureField, FailureNotice,
};
use doorman_form::{CredentialForm, EventRelay};
use doorman_provider::{IdentityProvider, ProviderError};
use doorman_store::LoginFlag;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Error from a password-reset request.
#[derive(Error, Debug)]
pub enum PasswordResetError {
    /// The form has no email to send the reset to
    #[error("No email address to send the reset to")]
    MissingEmail,

    /// The provider call failed
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Password sign-in orchestration over a shared credential form.
///
/// `submit` emits exactly one [`AuthOutcome`] on the `outcome` relay per
/// accepted attempt. A submit arriving while another attempt is still
/// outstanding is dropped without an event.
pub struct SignInFlow<P> {
    form: Arc<CredentialForm>,
    provider: Arc<P>,
    login_flag: LoginFlag,
    outcome: EventRelay<AuthOutcome>,
    in_flight: AtomicBool,
}

impl<P: IdentityProvider> SignInFlow<P> {
    pub fn new(form: Arc<CredentialForm>, provider: Arc<P>, login_flag: LoginFlag) -> Self {
        Self {
            form,
            provider,
            login_flag,
            outcome: EventRelay::new(),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Terminal events, one per accepted attempt.
    pub fn outcome(&self) -> &EventRelay<AuthOutcome> {
        &self.outcome
    }

    /// Run one sign-in attempt with the form's current credentials.
    ///
    /// Empty fields fail locally without a provider call; provider
    /// errors are classified onto the field the user should correct.
    pub async fn submit(&self) {
        let Some(_attempt) = AttemptGuard::acquire(&self.in_flight) else {
            debug!("Sign-in attempt already outstanding; submit ignored");
            return;
        };

        let email = self.form.email().get();
        let password = self.form.password().get();

        if email.is_empty() {
            self.outcome.publish(&AuthOutcome::Failure(FailureNotice::new(
                FailureCategory::RequiredField,
                FailureField::Email,
                messages::EMAIL_REQUIRED,
            )));
            return;
        }
        if password.is_empty() {
            self.outcome.publish(&AuthOutcome::Failure(FailureNotice::new(
                FailureCategory::RequiredField,
                FailureField::Password,
                messages::PASSWORD_REQUIRED,
            )));
            return;
        }

        debug!(email = %email, "Submitting sign-in");
        match self.provider.sign_in(&email, &password).await {
            Ok(session) => {
                if let Err(error) = self.login_flag.set_logged_in(true) {
                    warn!(error = %error, "Failed to persist login flag");
                }
                info!(user_id = %session.user_id, "Sign-in succeeded");
                self.outcome.publish(&AuthOutcome::Success);
            }
            Err(error) => {
                let notice = sign_in_failure_notice(&error);
                warn!(
                    category = ?notice.category,
                    field = ?notice.field,
                    "Sign-in failed"
                );
                self.outcome.publish(&AuthOutcome::Failure(notice));
            }
        }
    }

    /// Ask the provider to send a password reset for the form's email.
    ///
    /// Outside the outcome stream: a reset request is not a sign-in
    /// attempt.
    pub async fn request_password_reset(&self) -> Result<(), PasswordResetError> {
        let email = self.form.email().get();
        if email.is_empty() {
            return Err(PasswordResetError::MissingEmail);
        }
        self.provider.send_password_reset(&email).await?;
        info!("Password reset requested");
        Ok(())
    }
}
