//! Sign-in orchestration for the Doorman engine.
//!
//! This crate provides:
//! - `SignInFlow`: password sign-in with local precondition checks and
//!   data-driven failure classification
//! - `RegistrationFlow`: account creation with the account-exists
//!   sign-in fallback
//! - `FederatedFlow`: the nonce-bound broker round-trip behind an
//!   explicit FSM
//! - `SignOutFlow`: provider sign-out plus local flag clearing
//! - `NonceChallenge`: one-time challenge generation and hashing
//!
//! Every flow emits exactly one terminal event per accepted attempt and
//! resolves all provider errors at its boundary.

mod attempt;
mod federated;
mod nonce;
mod outcome;
mod registration;
mod signin;
mod signout;

pub use federated::{
    FederatedFlow, FederatedMachine, FederatedMachineInput, FederatedMachineState, FederatedState,
    FederatedStateCallback,
};
pub use nonce::{hash_nonce, NonceChallenge, NONCE_LENGTH};
pub use outcome::{
    messages, AuthOutcome, FailureCategory, FailureField, FailureNotice, FederatedFailure,
    FederatedFailureKind, FederatedOutcome,
};
pub use registration::RegistrationFlow;
pub use signin::{PasswordResetError, SignInFlow};
pub use signout::SignOutFlow;
