//! Host-side client: initiates the handshake, seals requests, opens sealed
//! replies. The host never sees key material beyond its own session half.

use std::collections::{BTreeMap, VecDeque};

use serde_json::Value;
use tracing::debug;

use channel::context::SESSION_ID_LEN;
use channel::handshake::{HandshakeConfig, HostHandshake};
use channel::limits::MAX_CODE;
use channel::ops::OpKind;
use channel::payload::{Request, Response};
use channel::wire::ErrorLabel;
use channel::{ChannelError, Session, WireMessage};

/// Host side of the handshake, between sending `Hello` and receiving
/// `HelloAck`.
pub struct HostConnector {
    handshake: HostHandshake,
}

impl HostConnector {
    pub fn start(config: HandshakeConfig) -> (Self, WireMessage) {
        let (handshake, hello) = HostHandshake::start(config);
        (Self { handshake }, hello)
    }

    /// Completes the handshake from the enclave's `HelloAck`. Anything else
    /// on the wire at this point is malformed.
    pub fn complete(self, msg: &WireMessage) -> Result<HostClient, ChannelError> {
        match msg {
            WireMessage::HelloAck {
                id,
                enclave_pub,
                nonce_enclave,
            } => {
                let session = self.handshake.complete(*id, enclave_pub, *nonce_enclave)?;
                Ok(HostClient {
                    session,
                    pending: VecDeque::new(),
                })
            }
            _ => Err(ChannelError::MalformedHello),
        }
    }
}

/// A live host endpoint. Requests are answered in order, so the client
/// keeps a FIFO of outstanding operations to pick each reply's result tag.
pub struct HostClient {
    session: Session,
    pending: VecDeque<OpKind>,
}

impl HostClient {
    pub fn session_id(&self) -> [u8; SESSION_ID_LEN] {
        self.session.id()
    }

    pub fn request_evaluate(
        &mut self,
        source: &str,
        bindings: BTreeMap<String, Value>,
    ) -> Result<WireMessage, ChannelError> {
        if source.len() > MAX_CODE {
            return Err(ChannelError::TooLarge);
        }
        self.request(
            OpKind::Evaluate,
            Request::Evaluate {
                source: source.to_owned(),
                bindings,
            },
        )
    }

    pub fn request_sign(&mut self, tx: &[u8], key: &[u8]) -> Result<WireMessage, ChannelError> {
        self.request(
            OpKind::Sign,
            Request::Sign {
                tx: tx.to_vec(),
                key: key.to_vec(),
            },
        )
    }

    fn request(&mut self, op: OpKind, request: Request) -> Result<WireMessage, ChannelError> {
        let body = request.to_bytes()?;
        let record = self.session.seal(&body, op.aad_in())?;
        self.pending.push_back(op);
        Ok(WireMessage::Cipher {
            id: self.session.id(),
            record,
        })
    }

    /// Opens a reply record and parses the sealed response. Wire `Error`
    /// records surface as the corresponding channel error.
    pub fn handle_reply(&mut self, msg: &WireMessage) -> Result<Response, ChannelError> {
        match msg {
            WireMessage::Cipher { id, record } => {
                if *id != self.session.id() {
                    return Err(ChannelError::ContextMismatch);
                }
                let op = self.pending.front().ok_or(ChannelError::ContextMismatch)?;
                let body = self.session.open(record, op.aad_out())?;
                self.pending.pop_front();
                Response::from_bytes(&body)
            }
            WireMessage::Error { kind, seq, id: _ } => {
                debug!(kind = kind.as_str(), ?seq, "enclave reported an error");
                Err(match kind {
                    ErrorLabel::Replay => ChannelError::Replay,
                    ErrorLabel::Sequence => ChannelError::SequenceViolation,
                    ErrorLabel::TooLarge => ChannelError::TooLarge,
                    ErrorLabel::Internal => ChannelError::Closed,
                })
            }
            WireMessage::Hello { .. } | WireMessage::HelloAck { .. } => {
                Err(ChannelError::MalformedHello)
            }
        }
    }
}
