//! # GCP SASL/PLAIN
//!
//! A SASL/PLAIN client mechanism that authenticates as a Google Cloud
//! principal: the authentication identity is the principal email, the
//! password is a fresh OAuth2 access token.
//!
//! Modules:
//! - `sasl`: mechanism and handshake state machine
//! - `principal`: principal email resolution and validation
//! - `credentials`: application default credentials discovery
//! - `sources`: token providers (metadata server, HTTP endpoint, env, file)
//! - `cache`: access tokens and the refreshing token cache
//! - `config`: YAML configuration, loading and validation
//! - `observability`: prometheus metrics

pub mod cache;
pub mod config;
pub mod credentials;
pub mod error;
pub mod helpers;
pub mod observability;
pub mod principal;
pub mod resilience;
pub mod sasl;
pub mod sources;
pub mod utils;

#[cfg(test)]
mod tests;

pub use crate::config::ServiceConfig;
pub use crate::error::{MechanismError, ResolutionError, ValidationError};
pub use crate::principal::{validate_principal_email, PrincipalEmail, PrincipalEmailResolver};
pub use crate::sasl::{plain_payload, GcpPlainMechanism, Mechanism, StateMachine};
pub use crate::sources::TokenProvider;
