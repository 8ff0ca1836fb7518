//! Transport-agnostic wire records. The embedding frames them however it
//! likes; here they are bincode blobs with a hard decode cap.

use serde::{Deserialize, Serialize};

use crate::context::{HANDSHAKE_NONCE_LEN, SESSION_ID_LEN};
use crate::error::ChannelError;
use crate::limits::MAX_WIRE_FRAME;
use crate::record::CipherRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WireMessage {
    Hello {
        id: [u8; SESSION_ID_LEN],
        host_pub: Vec<u8>,
        nonce_host: [u8; HANDSHAKE_NONCE_LEN],
    },
    HelloAck {
        id: [u8; SESSION_ID_LEN],
        enclave_pub: Vec<u8>,
        nonce_enclave: [u8; HANDSHAKE_NONCE_LEN],
    },
    Cipher {
        id: [u8; SESSION_ID_LEN],
        record: CipherRecord,
    },
    Error {
        id: [u8; SESSION_ID_LEN],
        kind: ErrorLabel,
        seq: Option<u64>,
    },
}

impl WireMessage {
    pub fn session_id(&self) -> [u8; SESSION_ID_LEN] {
        match self {
            WireMessage::Hello { id, .. }
            | WireMessage::HelloAck { id, .. }
            | WireMessage::Cipher { id, .. }
            | WireMessage::Error { id, .. } => *id,
        }
    }
}

/// The only failure kinds ever reported on the wire. Deliberately coarse:
/// nothing here distinguishes one crypto failure from another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorLabel {
    Replay,
    Sequence,
    TooLarge,
    Internal,
}

impl ErrorLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorLabel::Replay => "replay",
            ErrorLabel::Sequence => "sequence",
            ErrorLabel::TooLarge => "too-large",
            ErrorLabel::Internal => "internal",
        }
    }

    /// Maps a local failure to its wire label; `None` means the failure is
    /// reported to nobody (silent drop).
    pub fn for_error(err: &ChannelError) -> Option<Self> {
        match err {
            ChannelError::Replay => Some(ErrorLabel::Replay),
            ChannelError::SequenceViolation => Some(ErrorLabel::Sequence),
            ChannelError::TooLarge => Some(ErrorLabel::TooLarge),
            ChannelError::SequenceExhausted => Some(ErrorLabel::Internal),
            _ => None,
        }
    }
}

pub fn encode(msg: &WireMessage) -> Result<Vec<u8>, ChannelError> {
    bincode::serialize(msg).map_err(|_| ChannelError::MalformedRecord)
}

pub fn decode(bytes: &[u8]) -> Result<WireMessage, ChannelError> {
    if bytes.len() > MAX_WIRE_FRAME {
        return Err(ChannelError::TooLarge);
    }
    bincode::deserialize(bytes).map_err(|_| ChannelError::MalformedRecord)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips() {
        let msg = WireMessage::Cipher {
            id: [9; SESSION_ID_LEN],
            record: CipherRecord {
                seq: 42,
                nonce: [1; 12],
                ciphertext: vec![2, 3, 4],
                aad_tag: "tag".into(),
            },
        };
        let bytes = encode(&msg).unwrap();
        assert_eq!(decode(&bytes).unwrap(), msg);
    }

    #[test]
    fn oversized_frame_rejected_before_parse() {
        let bytes = vec![0u8; MAX_WIRE_FRAME + 1];
        assert!(matches!(decode(&bytes), Err(ChannelError::TooLarge)));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            decode(&[0xff; 8]),
            Err(ChannelError::MalformedRecord)
        ));
    }

    #[test]
    fn silent_failures_have_no_label() {
        assert_eq!(ErrorLabel::for_error(&ChannelError::ContextMismatch), None);
        assert_eq!(
            ErrorLabel::for_error(&ChannelError::Crypto(crypto::CryptoError)),
            None
        );
        assert_eq!(ErrorLabel::for_error(&ChannelError::MalformedHello), None);
        assert_eq!(
            ErrorLabel::for_error(&ChannelError::Replay),
            Some(ErrorLabel::Replay)
        );
    }
}
