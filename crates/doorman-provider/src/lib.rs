//! Identity-provider boundary for the Doorman sign-in engine.
//!
//! This crate provides:
//! - The `IdentityProvider` and `FederatedBroker` traits the sign-in
//!   flows call
//! - `HttpProvider`, a REST client for a GoTrue-style auth service
//! - Provider error types and the data-driven error-code classification
//! - Client configuration with compile-time defaults and file/env
//!   overrides

mod codes;
mod config;
mod error;
mod http;
mod traits;

pub use codes::{classify_error, ErrorCode};
pub use config::{ProviderConfig, DEFAULT_PROVIDER_URL, DEFAULT_PUBLISHABLE_KEY};
pub use error::{BrokerError, ProviderError, ProviderResult};
pub use http::HttpProvider;
pub use traits::{BrokerAuthorization, BrokerScope, FederatedBroker, IdentityProvider, Session};
