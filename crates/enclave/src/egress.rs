//! The egress gate. Once a session is live, the only things allowed out of
//! the enclave compartment are ciphertext records and opaque error records,
//! and only addressed to the session peer.

use channel::context::SESSION_ID_LEN;
use channel::{ChannelError, WireMessage};

pub fn vet(session_id: [u8; SESSION_ID_LEN], msg: &WireMessage) -> Result<(), ChannelError> {
    match msg {
        WireMessage::Cipher { id, .. } | WireMessage::Error { id, .. } => {
            if *id == session_id {
                Ok(())
            } else {
                Err(ChannelError::EgressViolation)
            }
        }
        WireMessage::Hello { .. } | WireMessage::HelloAck { .. } => {
            Err(ChannelError::EgressViolation)
        }
    }
}
