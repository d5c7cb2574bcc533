//! Account registration flow.

use crate::attempt::AttemptGuard;
use crate::outcome::{
    messages, registration_failure_notice, sign_in_failure_notice, AuthOutcome, FailureCategory,
    FailureField, FailureNotice,
};
use doorman_form::{CredentialForm, EventRelay};
use doorman_provider::{classify_error, ErrorCode, IdentityProvider, Session};
use doorman_store::LoginFlag;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Registration orchestration, a sibling of [`crate::SignInFlow`].
///
/// A creation attempt against an already-registered email silently
/// falls back to signing in with the same credentials, so re-submitting
/// a registration form twice converges on a signed-in session.
pub struct RegistrationFlow<P> {
    form: Arc<CredentialForm>,
    provider: Arc<P>,
    login_flag: LoginFlag,
    outcome: EventRelay<AuthOutcome>,
    in_flight: AtomicBool,
}

impl<P: IdentityProvider> RegistrationFlow<P> {
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

    /// Run one registration attempt with the form's current credentials.
    pub async fn submit(&self) {
        let Some(_attempt) = AttemptGuard::acquire(&self.in_flight) else {
            debug!("Registration attempt already outstanding; submit ignored");
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

        debug!(email = %email, "Submitting registration");
        match self.provider.create_account(&email, &password).await {
            Ok(session) => self.finish_success(session),
            Err(error) if classify_error(&error) == ErrorCode::AccountExists => {
                debug!(email = %email, "Account already exists; signing in instead");
                match self.provider.sign_in(&email, &password).await {
                    Ok(session) => self.finish_success(session),
                    Err(error) => {
                        let notice = sign_in_failure_notice(&error);
                        warn!(
                            category = ?notice.category,
                            field = ?notice.field,
                            "Fallback sign-in failed"
                        );
                        self.outcome.publish(&AuthOutcome::Failure(notice));
                    }
                }
            }
            Err(error) => {
                let notice = registration_failure_notice(&error);
                warn!(category = ?notice.category, "Registration failed");
                self.outcome.publish(&AuthOutcome::Failure(notice));
            }
        }
    }

    fn finish_success(&self, session: Session) {
        if let Err(error) = self.login_flag.set_logged_in(true) {
            warn!(error = %error, "Failed to persist login flag");
        }
        info!(user_id = %session.user_id, "Registration completed");
        self.outcome.publish(&AuthOutcome::Success);
    }
}
