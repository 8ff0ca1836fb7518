//! Enclave-side request pipeline: a per-session state machine that opens
//! sealed requests, dispatches them to pluggable handlers, and re-seals the
//! results. Plaintext never leaves this crate; the only things that go back
//! out are `Cipher` and `Error` wire records.

use std::collections::BTreeMap;

use serde_json::Value;

pub mod dispatch;
pub mod egress;
pub mod pipeline;

pub use pipeline::{Enclave, EnclaveConfig, EnclaveStats};

/// Failure reported by an external handler. The message travels to the host
/// inside a sealed record, never in the clear.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct HandlerFailure(pub String);

impl HandlerFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// The sandboxed code evaluator. External collaborator; the pipeline treats
/// it as a black box that must poll `interrupt` between units of work so
/// deadlines stay enforceable.
pub trait Evaluator {
    fn evaluate(
        &self,
        source: &str,
        bindings: &BTreeMap<String, Value>,
        interrupt: &dyn Fn() -> bool,
    ) -> Result<Value, HandlerFailure>;
}

/// The transaction signer. Borrows the key bytes for the duration of the
/// call only; the pipeline wipes them afterwards on every path.
pub trait Signer {
    fn sign(&self, tx: &[u8], key: &[u8]) -> Result<Vec<u8>, HandlerFailure>;
}
