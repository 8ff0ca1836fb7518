//! Shared protocol core of the host ↔ enclave channel: handshake context,
//! session state, record layer, replay/sequence guard, wire records and
//! application payloads.

pub mod aad;
pub mod context;
pub mod error;
pub mod handshake;
pub mod limits;
pub mod ops;
pub mod payload;
pub mod record;
pub mod replay;
pub mod session;
pub mod wire;

pub use error::ChannelError;
pub use handshake::{respond, HandshakeConfig, HostHandshake};
pub use record::CipherRecord;
pub use session::{Role, Session};
pub use wire::{ErrorLabel, WireMessage};
