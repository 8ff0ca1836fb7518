//! One-round context-bound handshake. The host opens with `Hello`, the
//! enclave answers `HelloAck`, both derive the same pair of directional
//! keys from the ECDH secret and the full transcript.
//!
//! Failures here are never reported to the peer; the caller drops the
//! offending message and stays quiet.

use tracing::debug;

use crypto::ecdh::EcdhKeyPair;

use crate::context::{HandshakeContext, HANDSHAKE_NONCE_LEN, SESSION_ID_LEN};
use crate::error::ChannelError;
use crate::session::{Role, Session};
use crate::wire::WireMessage;

/// What an endpoint knows about the channel before any message is sent.
/// Both sides build one independently; every field is bound into the
/// transcript.
#[derive(Debug, Clone)]
pub struct HandshakeConfig {
    pub host_origin: String,
    pub enclave_origin: String,
    pub code_hash: String,
    pub sequence_window: u64,
}

/// Host side, between `Hello` and `HelloAck`.
pub struct HostHandshake {
    config: HandshakeConfig,
    keys: EcdhKeyPair,
    id: [u8; SESSION_ID_LEN],
    nonce_host: [u8; HANDSHAKE_NONCE_LEN],
}

impl HostHandshake {
    /// Generates the ephemeral keypair, session id and host nonce, and
    /// returns the `Hello` to send.
    pub fn start(config: HandshakeConfig) -> (Self, WireMessage) {
        let keys = EcdhKeyPair::generate();
        let id = crypto::secure_random::<SESSION_ID_LEN>();
        let nonce_host = crypto::secure_random::<HANDSHAKE_NONCE_LEN>();
        let hello = WireMessage::Hello {
            id,
            host_pub: keys.public_key_sec1(),
            nonce_host,
        };
        (
            Self {
                config,
                keys,
                id,
                nonce_host,
            },
            hello,
        )
    }

    pub fn id(&self) -> [u8; SESSION_ID_LEN] {
        self.id
    }

    /// Consumes the `HelloAck` and derives the host session.
    pub fn complete(
        self,
        ack_id: [u8; SESSION_ID_LEN],
        enclave_pub: &[u8],
        nonce_enclave: [u8; HANDSHAKE_NONCE_LEN],
    ) -> Result<Session, ChannelError> {
        if ack_id != self.id {
            return Err(ChannelError::MalformedHello);
        }
        let host_pub = self.keys.public_key_sec1();
        let shared = self
            .keys
            .diffie_hellman(enclave_pub)
            .map_err(|_| ChannelError::MalformedHello)?;
        let ctx = HandshakeContext {
            host_origin: self.config.host_origin,
            enclave_origin: self.config.enclave_origin,
            code_hash: self.config.code_hash,
            nonce_host: self.nonce_host,
            nonce_enclave,
            host_pub,
            enclave_pub: enclave_pub.to_vec(),
        };
        debug!(id = %hex::encode(self.id), "host session derived");
        Session::derive(
            Role::Host,
            self.id,
            &shared,
            &ctx,
            self.config.sequence_window,
        )
    }
}

/// Enclave side: answers a `Hello` with a `HelloAck` and the derived
/// session, atomically.
pub fn respond(
    config: &HandshakeConfig,
    id: [u8; SESSION_ID_LEN],
    host_pub: &[u8],
    nonce_host: [u8; HANDSHAKE_NONCE_LEN],
) -> Result<(Session, WireMessage), ChannelError> {
    let keys = EcdhKeyPair::generate();
    let nonce_enclave = crypto::secure_random::<HANDSHAKE_NONCE_LEN>();
    let enclave_pub = keys.public_key_sec1();
    let shared = keys
        .diffie_hellman(host_pub)
        .map_err(|_| ChannelError::MalformedHello)?;

    let ctx = HandshakeContext {
        host_origin: config.host_origin.clone(),
        enclave_origin: config.enclave_origin.clone(),
        code_hash: config.code_hash.clone(),
        nonce_host,
        nonce_enclave,
        host_pub: host_pub.to_vec(),
        enclave_pub: enclave_pub.clone(),
    };
    let session = Session::derive(
        Role::Enclave,
        id,
        &shared,
        &ctx,
        config.sequence_window,
    )?;
    debug!(id = %hex::encode(id), "enclave session derived");
    let ack = WireMessage::HelloAck {
        id,
        enclave_pub,
        nonce_enclave,
    };
    Ok((session, ack))
}
