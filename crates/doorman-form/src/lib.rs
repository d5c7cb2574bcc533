//! Credential form state for the Doorman sign-in engine.
//!
//! This crate provides:
//! - Pure email/password validators with the shared policy constants
//! - `ValueRelay`/`EventRelay`, the observer primitives used across Doorman
//! - `CredentialForm`, the reactive email/password state with derived
//!   validity flags that are never observable in a torn combination

mod form;
mod relay;
mod validators;

pub use form::CredentialForm;
pub use relay::{EventRelay, ValueRelay};
pub use validators::{is_valid_email, is_valid_password, MIN_PASSWORD_LENGTH};
