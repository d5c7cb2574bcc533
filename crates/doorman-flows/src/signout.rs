//! Provider sign-out flow.

use crate::outcome::messages;
use doorman_form::EventRelay;
use doorman_provider::IdentityProvider;
use doorman_store::LoginFlag;
use std::sync::Arc;
use tracing::{info, warn};

/// Sign-out orchestration.
///
/// The local login flag is cleared whether or not the provider call
/// succeeds. A provider-side failure surfaces as a one-shot message
/// and never blocks local sign-out.
pub struct SignOutFlow<P> {
    provider: Arc<P>,
    login_flag: LoginFlag,
    failure_message: EventRelay<String>,
}

impl<P: IdentityProvider> SignOutFlow<P> {
    pub fn new(provider: Arc<P>, login_flag: LoginFlag) -> Self {
        Self {
            provider,
            login_flag,
            failure_message: EventRelay::new(),
        }
    }

    /// One-shot notices from failed provider-side sign-outs.
    pub fn failure_message(&self) -> &EventRelay<String> {
        &self.failure_message
    }

    /// Sign out of the provider and clear the local login flag.
    pub async fn sign_out(&self) {
        let result = self.provider.sign_out().await;

        if let Err(error) = self.login_flag.set_logged_in(false) {
            warn!(error = %error, "Failed to clear login flag");
        }

        match result {
            Ok(()) => info!("Signed out"),
            Err(error) => {
                warn!(error = %error, "Provider sign-out failed");
                self.failure_message
                    .publish(&messages::SIGN_OUT_FAILED.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doorman_provider::{ProviderError, ProviderResult, Session};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn api_error(code: &str) -> ProviderError {
        ProviderError::Api {
            status: 400,
            code: Some(code.to_string()),
            message: String::new(),
        }
    }

    #[derive(Default)]
    struct ScriptedProvider {
        sign_out_calls: AtomicUsize,
        sign_out_error: Mutex<Option<ProviderError>>,
    }

    impl IdentityProvider for ScriptedProvider {
        async fn sign_in(&self, _email: &str, _password: &str) -> ProviderResult<Session> {
            Err(api_error("not_scripted"))
        }

        async fn create_account(&self, _email: &str, _password: &str) -> ProviderResult<Session> {
            Err(api_error("not_scripted"))
        }

        async fn exchange_federated_credential(
            &self,
            _identity_token: &str,
            _raw_nonce: &str,
            _display_name: Option<&str>,
        ) -> ProviderResult<Session> {
            Err(api_error("not_scripted"))
        }

        async fn sign_out(&self) -> ProviderResult<()> {
            self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
            match self.sign_out_error.lock().unwrap().take() {
                Some(error) => Err(error),
                None => Ok(()),
            }
        }

        async fn send_password_reset(&self, _email: &str) -> ProviderResult<()> {
            Ok(())
        }
    }

    fn harness(
        provider: ScriptedProvider,
    ) -> (
        SignOutFlow<ScriptedProvider>,
        Arc<ScriptedProvider>,
        LoginFlag,
        Arc<Mutex<Vec<String>>>,
    ) {
        let provider = Arc::new(provider);
        let flag = LoginFlag::in_memory();
        flag.set_logged_in(true).unwrap();
        let flow = SignOutFlow::new(provider.clone(), flag.clone());

        let notices = Arc::new(Mutex::new(Vec::new()));
        let sink = notices.clone();
        flow.failure_message()
            .subscribe(move |message: &String| sink.lock().unwrap().push(message.clone()));

        (flow, provider, flag, notices)
    }

    #[tokio::test]
    async fn sign_out_clears_the_flag_quietly() {
        let (flow, provider, flag, notices) = harness(ScriptedProvider::default());

        flow.sign_out().await;

        assert!(!flag.is_logged_in().unwrap());
        assert!(notices.lock().unwrap().is_empty());
        assert_eq!(provider.sign_out_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn provider_failure_still_clears_the_flag() {
        let provider = ScriptedProvider::default();
        *provider.sign_out_error.lock().unwrap() = Some(api_error("unexpected_failure"));
        let (flow, _provider, flag, notices) = harness(provider);

        flow.sign_out().await;

        assert!(!flag.is_logged_in().unwrap());
        assert_eq!(
            *notices.lock().unwrap(),
            vec![messages::SIGN_OUT_FAILED.to_string()]
        );
    }
}
