//! The per-session message loop: `Waiting → Ready → Closed`. A `Hello`
//! derives the session and answers `HelloAck`; each `Cipher` is opened,
//! dispatched and answered with a sealed result; fatal failures reply with
//! an opaque `Error` record and close.

use std::time::{Duration, Instant};

use tracing::{debug, warn};
use zeroize::Zeroizing;

use channel::handshake::{self, HandshakeConfig};
use channel::ops::OpKind;
use channel::payload::{Request, Response};
use channel::record::CipherRecord;
use channel::wire::ErrorLabel;
use channel::{ChannelError, Session, WireMessage};

use crate::egress;
use crate::{dispatch, Evaluator, Signer};

#[derive(Debug, Clone)]
pub struct EnclaveConfig {
    pub handshake: HandshakeConfig,
    /// Per-request handler deadline.
    pub deadline: Duration,
}

enum State {
    Waiting,
    Ready { session: Session },
    Closed,
}

/// Counters a supervisor can read without touching session internals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnclaveStats {
    pub recv_aead_ops: u64,
    pub send_aead_ops: u64,
    pub closed: bool,
}

pub struct Enclave<E, S> {
    config: EnclaveConfig,
    evaluator: E,
    signer: S,
    state: State,
}

impl<E: Evaluator, S: Signer> Enclave<E, S> {
    pub fn new(config: EnclaveConfig, evaluator: E, signer: S) -> Self {
        Self {
            config,
            evaluator,
            signer,
            state: State::Waiting,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, State::Ready { .. })
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, State::Closed)
    }

    pub fn stats(&self) -> EnclaveStats {
        let (recv, send) = match &self.state {
            State::Ready { session } => (session.recv_aead_ops(), session.send_aead_ops()),
            _ => (0, 0),
        };
        EnclaveStats {
            recv_aead_ops: recv,
            send_aead_ops: send,
            closed: self.is_closed(),
        }
    }

    /// Feeds one wire message through the state machine and returns the
    /// records to send back. Silent failures return nothing.
    pub fn handle(&mut self, msg: &WireMessage) -> Vec<WireMessage> {
        match msg {
            WireMessage::Hello {
                id,
                host_pub,
                nonce_host,
            } => self.on_hello(*id, host_pub, *nonce_host),
            WireMessage::Cipher { id, record } => self.on_cipher(*id, record),
            WireMessage::HelloAck { .. } => {
                // Enclaves answer acks, they do not receive them.
                Vec::new()
            }
            WireMessage::Error { kind, .. } => {
                warn!(kind = kind.as_str(), "peer reported an error");
                Vec::new()
            }
        }
    }

    fn on_hello(
        &mut self,
        id: [u8; 16],
        host_pub: &[u8],
        nonce_host: [u8; 16],
    ) -> Vec<WireMessage> {
        match self.state {
            State::Waiting => {}
            // A session already exists (or existed); later hellos are noise.
            State::Ready { .. } | State::Closed => return Vec::new(),
        }
        match handshake::respond(&self.config.handshake, id, host_pub, nonce_host) {
            Ok((session, ack)) => {
                self.state = State::Ready { session };
                vec![ack]
            }
            Err(err) => {
                debug!(%err, "handshake rejected");
                Vec::new()
            }
        }
    }

    fn on_cipher(&mut self, id: [u8; 16], record: &CipherRecord) -> Vec<WireMessage> {
        let session = match &mut self.state {
            State::Ready { session } => session,
            State::Waiting | State::Closed => return Vec::new(),
        };
        if id != session.id() {
            debug!("record for unknown peer dropped");
            return Vec::new();
        }

        // Routing comes from framing, outside the ciphertext. Result tags
        // and unknown tags have no place in the request direction.
        let op = match OpKind::for_request_tag(&record.aad_tag) {
            Some(op) => op,
            None => {
                debug!(tag = %record.aad_tag, "unroutable aad tag dropped");
                return Vec::new();
            }
        };

        let body = match session.open(record, op.aad_in()) {
            Ok(body) => Zeroizing::new(body),
            Err(err) => return self.fail(record.seq, err),
        };

        let response = match Request::from_bytes(&body) {
            Ok(request) => {
                let deadline = Instant::now() + self.config.deadline;
                dispatch::run(op, request, &self.evaluator, &self.signer, deadline)
            }
            Err(_) => Response::handler_error("malformed request body"),
        };

        self.reply(op, response)
    }

    /// Seals a response and vets it through the egress gate.
    fn reply(&mut self, op: OpKind, response: Response) -> Vec<WireMessage> {
        let session = match &mut self.state {
            State::Ready { session } => session,
            _ => return Vec::new(),
        };
        let body = match response.to_bytes() {
            Ok(body) => body,
            Err(_) => return self.fail(0, ChannelError::MalformedPayload),
        };
        let sealed = match session.seal(&body, op.aad_out()) {
            Ok(record) => WireMessage::Cipher {
                id: session.id(),
                record,
            },
            Err(err) => return self.fail(0, err),
        };
        match egress::vet(session.id(), &sealed) {
            Ok(()) => vec![sealed],
            Err(err) => {
                warn!(%err, "egress blocked, closing session");
                self.state = State::Closed;
                Vec::new()
            }
        }
    }

    /// Converts a failure into its wire form (if it has one) and tears the
    /// session down when the failure is fatal.
    fn fail(&mut self, seq: u64, err: ChannelError) -> Vec<WireMessage> {
        let session = match &self.state {
            State::Ready { session } => session,
            _ => return Vec::new(),
        };
        let id = session.id();
        debug!(%err, seq, "record rejected");

        let fatal = matches!(
            err,
            ChannelError::SequenceViolation
                | ChannelError::SequenceExhausted
                | ChannelError::MalformedPayload
        );
        let reply = ErrorLabel::for_error(&err).map(|kind| WireMessage::Error {
            id,
            kind,
            seq: (seq > 0).then_some(seq),
        });
        if fatal {
            self.state = State::Closed;
        }
        reply.into_iter().collect()
    }

    /// Drives the pipeline over an in-process transport until the peer goes
    /// away or the session closes. State only changes between awaits.
    pub async fn run(
        mut self,
        mut inbound: tokio::sync::mpsc::Receiver<WireMessage>,
        outbound: tokio::sync::mpsc::Sender<WireMessage>,
    ) {
        while let Some(msg) = inbound.recv().await {
            for out in self.handle(&msg) {
                if outbound.send(out).await.is_err() {
                    return;
                }
            }
            if self.is_closed() {
                debug!("session closed, pipeline stopping");
                return;
            }
        }
    }
}
