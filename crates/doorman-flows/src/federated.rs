//! Federated sign-in flow, driven by an explicit state machine.
//!
//! Each attempt issues a fresh nonce challenge, hands its hash to the
//! platform broker, and exchanges the broker's identity token together
//! with the raw nonce at the provider. The raw nonce leaves the process
//! only in that final exchange.
//!
//! ## State Diagram
//!
//! ```text
//! Idle ── Start ──► ChallengeIssued ── PresentBroker ──► BrokerPending
//!
//! BrokerPending ── TokenReceived ──► Exchanging
//! BrokerPending ── Cancelled / BrokerFailed ──► Failed
//!
//! Exchanging ── Accepted ──► Success
//! Exchanging ── Rejected ──► Failed
//!
//! Success / Failed ── Start ──► ChallengeIssued   (fresh challenge)
//! ```

use crate::nonce::NonceChallenge;
use crate::outcome::{messages, FederatedFailureKind, FederatedOutcome};
use doorman_form::EventRelay;
use doorman_provider::{
    classify_error, BrokerAuthorization, BrokerScope, ErrorCode, FederatedBroker, IdentityProvider,
};
use doorman_store::LoginFlag;
use rust_fsm::*;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

// The rust-fsm macro generates a module `federated_machine` with:
// - federated_machine::State (enum)
// - federated_machine::Input (enum)
// - federated_machine::StateMachine (type alias)
state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub federated_machine(Idle)

    Idle => {
        Start => ChallengeIssued
    },
    ChallengeIssued => {
        PresentBroker => BrokerPending
    },
    BrokerPending => {
        TokenReceived => Exchanging,
        Cancelled => Failed,
        BrokerFailed => Failed
    },
    Exchanging => {
        Accepted => Success,
        Rejected => Failed
    },
    Success => {
        Start => ChallengeIssued
    },
    Failed => {
        Start => ChallengeIssued
    }
}

// Re-export the generated types with clearer names
pub use federated_machine::Input as FederatedMachineInput;
pub use federated_machine::State as FederatedMachineState;
pub use federated_machine::StateMachine as FederatedMachine;

/// Observable attempt state for external consumption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FederatedState {
    /// No attempt underway.
    Idle,
    /// A challenge has been generated for the attempt.
    ChallengeIssued,
    /// Waiting on the platform broker.
    BrokerPending,
    /// Exchanging the broker's token at the provider.
    Exchanging,
    /// The attempt produced a session.
    Success,
    /// The attempt ended without a session.
    Failed,
}

impl FederatedState {
    /// Returns true while an attempt is between start and a terminal state.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            FederatedState::ChallengeIssued
                | FederatedState::BrokerPending
                | FederatedState::Exchanging
        )
    }

    /// Returns true once the attempt has concluded either way.
    pub fn is_terminal(&self) -> bool {
        matches!(self, FederatedState::Success | FederatedState::Failed)
    }
}

impl From<&FederatedMachineState> for FederatedState {
    fn from(state: &FederatedMachineState) -> Self {
        match state {
            FederatedMachineState::Idle => FederatedState::Idle,
            FederatedMachineState::ChallengeIssued => FederatedState::ChallengeIssued,
            FederatedMachineState::BrokerPending => FederatedState::BrokerPending,
            FederatedMachineState::Exchanging => FederatedState::Exchanging,
            FederatedMachineState::Success => FederatedState::Success,
            FederatedMachineState::Failed => FederatedState::Failed,
        }
    }
}

/// Callback invoked on every state change.
pub type FederatedStateCallback = Box<dyn Fn(FederatedState) + Send + Sync>;

/// Federated sign-in orchestration over a broker and a provider.
///
/// `start` runs one complete attempt. The machine rejects a second
/// start while an attempt is in flight and permits one from either
/// terminal state, so retries reuse the same flow value.
pub struct FederatedFlow<P, B> {
    provider: Arc<P>,
    broker: Arc<B>,
    login_flag: LoginFlag,
    fsm: Mutex<FederatedMachine>,
    challenge: Mutex<Option<NonceChallenge>>,
    state_callback: Mutex<Option<FederatedStateCallback>>,
    outcome: EventRelay<FederatedOutcome>,
}

impl<P: IdentityProvider, B: FederatedBroker> FederatedFlow<P, B> {
    pub fn new(provider: Arc<P>, broker: Arc<B>, login_flag: LoginFlag) -> Self {
        Self {
            provider,
            broker,
            login_flag,
            fsm: Mutex::new(FederatedMachine::new()),
            challenge: Mutex::new(None),
            state_callback: Mutex::new(None),
            outcome: EventRelay::new(),
        }
    }

    /// Terminal events, one per accepted attempt.
    pub fn outcome(&self) -> &EventRelay<FederatedOutcome> {
        &self.outcome
    }

    /// Current machine state.
    pub fn state(&self) -> FederatedState {
        FederatedState::from(self.fsm.lock().unwrap().state())
    }

    /// Register a callback for state changes.
    pub fn set_state_callback(&self, callback: FederatedStateCallback) {
        let mut cb = self.state_callback.lock().unwrap();
        *cb = Some(callback);
    }

    /// Run one federated sign-in attempt.
    ///
    /// A start while another attempt is in flight is rejected by the
    /// machine and dropped without an event.
    pub async fn start(&self) {
        if self.transition(&FederatedMachineInput::Start).is_none() {
            return;
        }

        let challenge = NonceChallenge::generate();
        let hashed = challenge.hashed().to_string();
        *self.challenge.lock().unwrap() = Some(challenge);
        debug!(challenge = %hashed, "Issued federated challenge");

        self.transition(&FederatedMachineInput::PresentBroker);
        let authorization = self
            .broker
            .authorize(&hashed, &[BrokerScope::FullName, BrokerScope::Email])
            .await;

        let outcome = match authorization {
            Ok(BrokerAuthorization::Authorized {
                identity_token,
                display_name,
            }) => {
                self.transition(&FederatedMachineInput::TokenReceived);
                self.exchange(&identity_token, display_name.as_deref()).await
            }
            Ok(BrokerAuthorization::Cancelled) => {
                debug!("Broker authorization cancelled");
                self.transition(&FederatedMachineInput::Cancelled);
                FederatedOutcome::failed(
                    FederatedFailureKind::Cancelled,
                    messages::FEDERATED_CANCELLED,
                )
            }
            Err(error) => {
                warn!(error = %error, "Broker authorization failed");
                self.transition(&FederatedMachineInput::BrokerFailed);
                FederatedOutcome::failed(
                    FederatedFailureKind::Broker,
                    messages::FEDERATED_BROKER_FAILED,
                )
            }
        };

        // A challenge never survives its attempt.
        self.challenge.lock().unwrap().take();
        self.outcome.publish(&outcome);
    }

    async fn exchange(
        &self,
        identity_token: &str,
        display_name: Option<&str>,
    ) -> FederatedOutcome {
        let challenge = self.challenge.lock().unwrap().take();
        let Some(challenge) = challenge else {
            warn!("No challenge outstanding for this attempt");
            self.transition(&FederatedMachineInput::Rejected);
            return FederatedOutcome::failed(
                FederatedFailureKind::Challenge,
                messages::FEDERATED_CHALLENGE_FAILED,
            );
        };
        let raw_nonce = challenge.into_raw();

        match self
            .provider
            .exchange_federated_credential(identity_token, &raw_nonce, display_name)
            .await
        {
            Ok(session) => {
                self.transition(&FederatedMachineInput::Accepted);
                if let Err(error) = self.login_flag.set_logged_in(true) {
                    warn!(error = %error, "Failed to persist login flag");
                }
                info!(user_id = %session.user_id, "Federated sign-in succeeded");
                FederatedOutcome::Success
            }
            Err(error) => {
                self.transition(&FederatedMachineInput::Rejected);
                warn!(error = %error, "Federated exchange rejected");
                match classify_error(&error) {
                    ErrorCode::ChallengeFailed => FederatedOutcome::failed(
                        FederatedFailureKind::Challenge,
                        messages::FEDERATED_CHALLENGE_FAILED,
                    ),
                    ErrorCode::Network => FederatedOutcome::failed(
                        FederatedFailureKind::Network,
                        messages::NETWORK_UNAVAILABLE,
                    ),
                    _ => FederatedOutcome::failed(
                        FederatedFailureKind::Provider,
                        messages::SIGN_IN_FAILED,
                    ),
                }
            }
        }
    }

    /// Apply an input to the machine, notifying the state callback on a
    /// change. Returns None if the machine rejected the input.
    fn transition(&self, input: &FederatedMachineInput) -> Option<FederatedState> {
        let mut fsm = self.fsm.lock().unwrap();
        let old_state = FederatedState::from(fsm.state());
        if fsm.consume(input).is_err() {
            drop(fsm);
            debug!(input = ?input, state = ?old_state, "Federated input rejected in current state");
            return None;
        }
        let new_state = FederatedState::from(fsm.state());
        drop(fsm);

        if old_state != new_state {
            debug!(old_state = ?old_state, new_state = ?new_state, "Federated state transition");
            self.notify_state_change(new_state.clone());
        }
        Some(new_state)
    }

    fn notify_state_change(&self, state: FederatedState) {
        let callback = self.state_callback.lock().unwrap();
        if let Some(callback) = callback.as_ref() {
            callback(state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nonce::hash_nonce;
    use crate::outcome::FederatedFailure;
    use doorman_provider::{BrokerError, ProviderError, ProviderResult, Session};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    #[test]
    fn test_initial_state_is_idle() {
        let machine = FederatedMachine::new();
        assert_eq!(*machine.state(), FederatedMachineState::Idle);
    }

    #[test]
    fn test_happy_path_reaches_success() {
        let mut machine = FederatedMachine::new();

        machine.consume(&FederatedMachineInput::Start).unwrap();
        assert_eq!(*machine.state(), FederatedMachineState::ChallengeIssued);

        machine
            .consume(&FederatedMachineInput::PresentBroker)
            .unwrap();
        assert_eq!(*machine.state(), FederatedMachineState::BrokerPending);

        machine
            .consume(&FederatedMachineInput::TokenReceived)
            .unwrap();
        assert_eq!(*machine.state(), FederatedMachineState::Exchanging);

        machine.consume(&FederatedMachineInput::Accepted).unwrap();
        assert_eq!(*machine.state(), FederatedMachineState::Success);
    }

    #[test]
    fn test_start_is_rejected_while_in_flight() {
        let mut machine = FederatedMachine::new();

        machine.consume(&FederatedMachineInput::Start).unwrap();
        assert!(machine.consume(&FederatedMachineInput::Start).is_err());
        assert_eq!(*machine.state(), FederatedMachineState::ChallengeIssued);
    }

    #[test]
    fn test_terminal_states_accept_a_fresh_start() {
        let mut machine = FederatedMachine::new();

        machine.consume(&FederatedMachineInput::Start).unwrap();
        machine
            .consume(&FederatedMachineInput::PresentBroker)
            .unwrap();
        machine.consume(&FederatedMachineInput::Cancelled).unwrap();
        assert_eq!(*machine.state(), FederatedMachineState::Failed);

        machine.consume(&FederatedMachineInput::Start).unwrap();
        assert_eq!(*machine.state(), FederatedMachineState::ChallengeIssued);
    }

    fn api_error(code: &str) -> ProviderError {
        ProviderError::Api {
            status: 400,
            code: Some(code.to_string()),
            message: String::new(),
        }
    }

    enum BrokerScript {
        Authorize(Option<String>),
        Cancel,
        Fail(String),
    }

    /// Broker double that records the challenges it was shown and
    /// embeds each one in the identity token it returns.
    #[derive(Default)]
    struct ScriptedBroker {
        challenges: Mutex<Vec<String>>,
        script: Mutex<VecDeque<BrokerScript>>,
    }

    impl ScriptedBroker {
        fn scripted(results: Vec<BrokerScript>) -> Self {
            Self {
                challenges: Mutex::new(Vec::new()),
                script: Mutex::new(results.into()),
            }
        }
    }

    impl FederatedBroker for ScriptedBroker {
        async fn authorize(
            &self,
            hashed_challenge: &str,
            scopes: &[BrokerScope],
        ) -> Result<BrokerAuthorization, BrokerError> {
            assert_eq!(scopes, [BrokerScope::FullName, BrokerScope::Email]);
            self.challenges
                .lock()
                .unwrap()
                .push(hashed_challenge.to_string());
            let next = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(BrokerScript::Authorize(None));
            match next {
                BrokerScript::Authorize(display_name) => Ok(BrokerAuthorization::Authorized {
                    identity_token: format!("token:{hashed_challenge}"),
                    display_name,
                }),
                BrokerScript::Cancel => Ok(BrokerAuthorization::Cancelled),
                BrokerScript::Fail(message) => Err(BrokerError(message)),
            }
        }
    }

    /// Provider double that checks the raw nonce against the hash the
    /// broker embedded in the token, like the real provider would.
    #[derive(Default)]
    struct VerifyingProvider {
        exchange_calls: AtomicUsize,
        force_error: Mutex<Option<ProviderError>>,
        seen_display_name: Mutex<Option<String>>,
    }

    impl IdentityProvider for VerifyingProvider {
        async fn sign_in(&self, _email: &str, _password: &str) -> ProviderResult<Session> {
            Err(api_error("not_scripted"))
        }

        async fn create_account(&self, _email: &str, _password: &str) -> ProviderResult<Session> {
            Err(api_error("not_scripted"))
        }

        async fn exchange_federated_credential(
            &self,
            identity_token: &str,
            raw_nonce: &str,
            display_name: Option<&str>,
        ) -> ProviderResult<Session> {
            self.exchange_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(error) = self.force_error.lock().unwrap().take() {
                return Err(error);
            }
            let embedded = identity_token.strip_prefix("token:").unwrap_or_default();
            if hash_nonce(raw_nonce) != embedded {
                return Err(api_error("nonce_mismatch"));
            }
            *self.seen_display_name.lock().unwrap() = display_name.map(str::to_string);
            Ok(Session {
                user_id: "fed-user".to_string(),
                display_name: display_name.map(str::to_string),
            })
        }

        async fn sign_out(&self) -> ProviderResult<()> {
            Ok(())
        }

        async fn send_password_reset(&self, _email: &str) -> ProviderResult<()> {
            Ok(())
        }
    }

    struct Harness {
        flow: FederatedFlow<VerifyingProvider, ScriptedBroker>,
        provider: Arc<VerifyingProvider>,
        broker: Arc<ScriptedBroker>,
        flag: LoginFlag,
        outcomes: Arc<Mutex<Vec<FederatedOutcome>>>,
    }

    impl Harness {
        fn new(provider: VerifyingProvider, broker: ScriptedBroker) -> Self {
            let provider = Arc::new(provider);
            let broker = Arc::new(broker);
            let flag = LoginFlag::in_memory();
            let flow = FederatedFlow::new(provider.clone(), broker.clone(), flag.clone());

            let outcomes = Arc::new(Mutex::new(Vec::new()));
            let sink = outcomes.clone();
            flow.outcome().subscribe(move |outcome: &FederatedOutcome| {
                sink.lock().unwrap().push(outcome.clone())
            });

            Self {
                flow,
                provider,
                broker,
                flag,
                outcomes,
            }
        }

        fn outcomes(&self) -> Vec<FederatedOutcome> {
            self.outcomes.lock().unwrap().clone()
        }

        fn challenges(&self) -> Vec<String> {
            self.broker.challenges.lock().unwrap().clone()
        }
    }

    fn failure(outcome: &FederatedOutcome) -> &FederatedFailure {
        match outcome {
            FederatedOutcome::Failed(failure) => failure,
            FederatedOutcome::Success => panic!("expected a failure"),
        }
    }

    #[tokio::test]
    async fn completed_attempt_signs_in_and_sets_the_flag() {
        let harness = Harness::new(VerifyingProvider::default(), ScriptedBroker::default());

        harness.flow.start().await;

        assert_eq!(harness.outcomes(), vec![FederatedOutcome::Success]);
        assert_eq!(harness.flow.state(), FederatedState::Success);
        assert!(harness.flag.is_logged_in().unwrap());
        assert_eq!(harness.provider.exchange_calls.load(Ordering::SeqCst), 1);

        let challenges = harness.challenges();
        assert_eq!(challenges.len(), 1);
        // The broker sees the sha256 hex digest, never the raw nonce.
        assert_eq!(challenges[0].len(), 64);
    }

    #[tokio::test]
    async fn display_name_from_the_broker_reaches_the_provider() {
        let harness = Harness::new(
            VerifyingProvider::default(),
            ScriptedBroker::scripted(vec![BrokerScript::Authorize(Some(
                "Ada Lovelace".to_string(),
            ))]),
        );

        harness.flow.start().await;

        assert_eq!(harness.outcomes(), vec![FederatedOutcome::Success]);
        assert_eq!(
            *harness.provider.seen_display_name.lock().unwrap(),
            Some("Ada Lovelace".to_string())
        );
    }

    #[tokio::test]
    async fn consecutive_attempts_use_fresh_challenges() {
        let harness = Harness::new(VerifyingProvider::default(), ScriptedBroker::default());

        harness.flow.start().await;
        harness.flow.start().await;

        assert_eq!(
            harness.outcomes(),
            vec![FederatedOutcome::Success, FederatedOutcome::Success]
        );
        let challenges = harness.challenges();
        assert_eq!(challenges.len(), 2);
        assert_ne!(challenges[0], challenges[1]);
    }

    #[tokio::test]
    async fn stale_raw_nonce_fails_verification() {
        let provider = VerifyingProvider::default();
        let stale = NonceChallenge::generate();
        let fresh = NonceChallenge::generate();
        let token = format!("token:{}", fresh.hashed());

        let error = provider
            .exchange_federated_credential(&token, &stale.into_raw(), None)
            .await
            .unwrap_err();

        assert_eq!(classify_error(&error), ErrorCode::ChallengeFailed);
    }

    #[tokio::test]
    async fn challenge_rejection_fails_the_attempt() {
        let provider = VerifyingProvider::default();
        *provider.force_error.lock().unwrap() = Some(api_error("nonce_mismatch"));
        let harness = Harness::new(provider, ScriptedBroker::default());

        harness.flow.start().await;

        let outcomes = harness.outcomes();
        assert_eq!(outcomes.len(), 1);
        let failure = failure(&outcomes[0]);
        assert_eq!(failure.kind, FederatedFailureKind::Challenge);
        assert_eq!(failure.message, messages::FEDERATED_CHALLENGE_FAILED);
        assert_eq!(harness.flow.state(), FederatedState::Failed);
        assert!(!harness.flag.is_logged_in().unwrap());
    }

    #[tokio::test]
    async fn cancellation_fails_without_an_exchange() {
        let harness = Harness::new(
            VerifyingProvider::default(),
            ScriptedBroker::scripted(vec![BrokerScript::Cancel]),
        );

        harness.flow.start().await;

        let outcomes = harness.outcomes();
        assert_eq!(failure(&outcomes[0]).kind, FederatedFailureKind::Cancelled);
        assert_eq!(harness.flow.state(), FederatedState::Failed);
        assert_eq!(harness.provider.exchange_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn broker_error_fails_the_attempt() {
        let harness = Harness::new(
            VerifyingProvider::default(),
            ScriptedBroker::scripted(vec![BrokerScript::Fail("authorization expired".to_string())]),
        );

        harness.flow.start().await;

        let outcomes = harness.outcomes();
        let failure = failure(&outcomes[0]);
        assert_eq!(failure.kind, FederatedFailureKind::Broker);
        assert_eq!(failure.message, messages::FEDERATED_BROKER_FAILED);
    }

    #[tokio::test]
    async fn retry_after_a_failure_starts_a_fresh_attempt() {
        let harness = Harness::new(
            VerifyingProvider::default(),
            ScriptedBroker::scripted(vec![BrokerScript::Cancel, BrokerScript::Authorize(None)]),
        );

        harness.flow.start().await;
        harness.flow.start().await;

        let outcomes = harness.outcomes();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(failure(&outcomes[0]).kind, FederatedFailureKind::Cancelled);
        assert_eq!(outcomes[1], FederatedOutcome::Success);

        let challenges = harness.challenges();
        assert_eq!(challenges.len(), 2);
        assert_ne!(challenges[0], challenges[1]);
    }

    #[tokio::test]
    async fn state_callback_observes_every_transition() {
        let harness = Harness::new(VerifyingProvider::default(), ScriptedBroker::default());
        let states = Arc::new(Mutex::new(Vec::new()));
        let sink = states.clone();
        harness
            .flow
            .set_state_callback(Box::new(move |state| sink.lock().unwrap().push(state)));

        harness.flow.start().await;

        assert_eq!(
            *states.lock().unwrap(),
            vec![
                FederatedState::ChallengeIssued,
                FederatedState::BrokerPending,
                FederatedState::Exchanging,
                FederatedState::Success,
            ]
        );
    }

    /// Broker double that parks inside authorize until released.
    #[derive(Default)]
    struct BlockingBroker {
        entered: Notify,
        release: Notify,
    }

    impl FederatedBroker for BlockingBroker {
        async fn authorize(
            &self,
            _hashed_challenge: &str,
            _scopes: &[BrokerScope],
        ) -> Result<BrokerAuthorization, BrokerError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(BrokerAuthorization::Cancelled)
        }
    }

    #[tokio::test]
    async fn start_while_in_flight_is_ignored() {
        let broker = Arc::new(BlockingBroker::default());
        let flow = Arc::new(FederatedFlow::new(
            Arc::new(VerifyingProvider::default()),
            broker.clone(),
            LoginFlag::in_memory(),
        ));
        let outcomes = Arc::new(Mutex::new(Vec::new()));
        let sink = outcomes.clone();
        flow.outcome().subscribe(move |outcome: &FederatedOutcome| {
            sink.lock().unwrap().push(outcome.clone())
        });

        let first = {
            let flow = flow.clone();
            tokio::spawn(async move { flow.start().await })
        };
        broker.entered.notified().await;

        // Second start while the first is parked inside the broker.
        flow.start().await;
        assert_eq!(flow.state(), FederatedState::BrokerPending);
        assert!(outcomes.lock().unwrap().is_empty());

        broker.release.notify_one();
        first.await.unwrap();

        let outcomes = outcomes.lock().unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(failure(&outcomes[0]).kind, FederatedFailureKind::Cancelled);
    }
}
