//! SASL client mechanisms
//!
//! The handshake driver calls [`Mechanism::start`] once per authentication
//! attempt, sends the initial response, then feeds every server challenge to
//! [`StateMachine::next`] until it reports completion.

use async_trait::async_trait;

use crate::error::MechanismError;

pub mod builder;
pub mod plain;

pub use builder::build_mechanism;
pub use plain::{plain_payload, GcpPlainMechanism};

/// Continuation of a handshake after the initial response.
#[async_trait]
pub trait StateMachine: Send + Sync {
    /// Returns `(done, response)`.
    async fn next(&self, challenge: &[u8]) -> Result<(bool, Option<Vec<u8>>), MechanismError>;
}

/// A client-side SASL mechanism.
#[async_trait]
pub trait Mechanism: Send + Sync {
    fn name(&self) -> &'static str;

    /// Begins a handshake, returning the continuation and the initial response.
    async fn start(&self) -> Result<(Box<dyn StateMachine>, Vec<u8>), MechanismError>;
}
