//! Post-handshake session state: one AEAD key and base nonce per direction,
//! send/receive counters, replay cache and size caps. A session is owned by
//! exactly one endpoint and never shared.

use zeroize::Zeroizing;

use crypto::aead::{AeadCipher, NONCE_LEN};
use crypto::ecdh::SHARED_SECRET_LEN;
use crypto::kdf::KeySchedule;

use crate::context::{HandshakeContext, SESSION_ID_LEN};
use crate::error::ChannelError;
use crate::limits::{MAX_CIPHERTEXT, MAX_PLAINTEXT, MAX_REPLAY_CACHE, SEQ_LIMIT};
use crate::record::{nonce_for_seq, CipherRecord};
use crate::replay::ReplayCache;

// Direction-labelled HKDF infos. Each direction gets its own key and base
// nonce, so the two counter spaces cannot collide even in principle.
const INFO_HOST_TO_ENCLAVE_KEY: &[u8] = b"enclave-channel/host->enclave/aead";
const INFO_HOST_TO_ENCLAVE_IV: &[u8] = b"enclave-channel/host->enclave/iv";
const INFO_ENCLAVE_TO_HOST_KEY: &[u8] = b"enclave-channel/enclave->host/aead";
const INFO_ENCLAVE_TO_HOST_IV: &[u8] = b"enclave-channel/enclave->host/iv";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Host,
    Enclave,
}

struct SendState {
    cipher: AeadCipher,
    base_nonce: [u8; NONCE_LEN],
    seq: u64,
}

impl SendState {
    /// Pre-increments the counter; the first record carries seq 1.
    fn next_seq(&mut self) -> Result<u64, ChannelError> {
        if self.seq + 1 >= SEQ_LIMIT {
            return Err(ChannelError::SequenceExhausted);
        }
        self.seq += 1;
        Ok(self.seq)
    }
}

struct RecvState {
    cipher: AeadCipher,
    base_nonce: [u8; NONCE_LEN],
    last_accepted_seq: u64,
    window: u64,
    replay: ReplayCache,
}

impl RecvState {
    fn check_seq(&self, seq: u64) -> Result<(), ChannelError> {
        if seq >= SEQ_LIMIT {
            return Err(ChannelError::SequenceExhausted);
        }
        let accepted = if self.window == 0 {
            seq == self.last_accepted_seq + 1
        } else {
            seq > self.last_accepted_seq && seq <= self.last_accepted_seq + self.window
        };
        if accepted {
            Ok(())
        } else {
            Err(ChannelError::SequenceViolation)
        }
    }
}

pub struct Session {
    id: [u8; SESSION_ID_LEN],
    send: SendState,
    recv: RecvState,
}

impl Session {
    /// Derives both directions from the handshake output. `role` selects
    /// which direction this endpoint sends on; the derivation itself is
    /// identical on both peers.
    pub fn derive(
        role: Role,
        id: [u8; SESSION_ID_LEN],
        shared: &Zeroizing<[u8; SHARED_SECRET_LEN]>,
        ctx: &HandshakeContext,
        window: u64,
    ) -> Result<Self, ChannelError> {
        let salt = ctx.transcript_salt();
        let schedule = KeySchedule::extract(&salt, shared.as_ref());

        let h2e_key = schedule.expand_key(INFO_HOST_TO_ENCLAVE_KEY)?;
        let h2e_iv = schedule.expand_nonce(INFO_HOST_TO_ENCLAVE_IV)?;
        let e2h_key = schedule.expand_key(INFO_ENCLAVE_TO_HOST_KEY)?;
        let e2h_iv = schedule.expand_nonce(INFO_ENCLAVE_TO_HOST_IV)?;

        let ((send_key, send_iv), (recv_key, recv_iv)) = match role {
            Role::Host => ((h2e_key, h2e_iv), (e2h_key, e2h_iv)),
            Role::Enclave => ((e2h_key, e2h_iv), (h2e_key, h2e_iv)),
        };

        Ok(Self {
            id,
            send: SendState {
                cipher: AeadCipher::new(&send_key),
                base_nonce: send_iv,
                seq: 0,
            },
            recv: RecvState {
                cipher: AeadCipher::new(&recv_key),
                base_nonce: recv_iv,
                last_accepted_seq: 0,
                window,
                replay: ReplayCache::new(MAX_REPLAY_CACHE),
            },
        })
    }

    pub fn id(&self) -> [u8; SESSION_ID_LEN] {
        self.id
    }

    /// Seals `body` under the next sequence number with the given AAD tag.
    pub fn seal(&mut self, body: &[u8], aad_tag: &str) -> Result<CipherRecord, ChannelError> {
        if body.len() > MAX_PLAINTEXT {
            return Err(ChannelError::TooLarge);
        }
        let seq = self.send.next_seq()?;
        let nonce = nonce_for_seq(&self.send.base_nonce, seq);
        let ciphertext = self.send.cipher.seal(&nonce, aad_tag.as_bytes(), body)?;
        Ok(CipherRecord {
            seq,
            nonce,
            ciphertext,
            aad_tag: aad_tag.to_owned(),
        })
    }

    /// Opens a received record. Check order is load-bearing: tag equality,
    /// then size cap, then replay, then crypto, then sequence acceptance.
    /// Replay is decided before any AEAD work so a duplicated nonce cannot
    /// probe decryption timing; size is decided before both.
    pub fn open(
        &mut self,
        record: &CipherRecord,
        expected_aad_tag: &str,
    ) -> Result<Vec<u8>, ChannelError> {
        if record.aad_tag != expected_aad_tag {
            return Err(ChannelError::ContextMismatch);
        }
        if record.ciphertext.len() > MAX_CIPHERTEXT {
            return Err(ChannelError::TooLarge);
        }
        if self.recv.replay.contains(&record.nonce) {
            return Err(ChannelError::Replay);
        }

        // The nonce must be the one this seq derives to; anything else is
        // indistinguishable from a forgery.
        let derived = nonce_for_seq(&self.recv.base_nonce, record.seq);
        if !crypto::ct_eq(&derived, &record.nonce) {
            return Err(crypto::CryptoError.into());
        }

        let body = self
            .recv
            .cipher
            .open(&record.nonce, record.aad_tag.as_bytes(), &record.ciphertext)?;
        if body.len() > MAX_PLAINTEXT {
            return Err(ChannelError::TooLarge);
        }

        self.recv.check_seq(record.seq)?;
        self.recv.replay.insert(record.nonce);
        self.recv.last_accepted_seq = record.seq;
        Ok(body)
    }

    /// Sequence number of the last record this session accepted.
    pub fn last_accepted_seq(&self) -> u64 {
        self.recv.last_accepted_seq
    }

    /// AEAD attempts on the receive direction; lets callers verify that
    /// rejected records never reached the cipher.
    pub fn recv_aead_ops(&self) -> u64 {
        self.recv.cipher.ops()
    }

    /// AEAD attempts on the send direction.
    pub fn send_aead_ops(&self) -> u64 {
        self.send.cipher.ops()
    }

    #[cfg(test)]
    pub(crate) fn replay_len(&self) -> usize {
        self.recv.replay.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> HandshakeContext {
        HandshakeContext {
            host_origin: "A".into(),
            enclave_origin: "B".into(),
            code_hash: "H".into(),
            nonce_host: [0u8; 16],
            nonce_enclave: [0xff; 16],
            host_pub: vec![4u8; 65],
            enclave_pub: vec![4u8; 65],
        }
    }

    fn pair(window: u64) -> (Session, Session) {
        let shared = Zeroizing::new([7u8; SHARED_SECRET_LEN]);
        let ctx = context();
        let host = Session::derive(Role::Host, [1; 16], &shared, &ctx, window).unwrap();
        let enclave = Session::derive(Role::Enclave, [1; 16], &shared, &ctx, window).unwrap();
        (host, enclave)
    }

    #[test]
    fn directions_are_independent() {
        let (mut host, mut enclave) = pair(0);
        let up = host.seal(b"up", "tag-a").unwrap();
        let down = enclave.seal(b"down", "tag-a").unwrap();
        // Same seq on both directions, different keys and nonce bases.
        assert_eq!(up.seq, 1);
        assert_eq!(down.seq, 1);
        assert_ne!(up.nonce, down.nonce);
        assert_eq!(enclave.open(&up, "tag-a").unwrap(), b"up");
        assert_eq!(host.open(&down, "tag-a").unwrap(), b"down");
    }

    #[test]
    fn first_record_is_seq_one() {
        let (mut host, _) = pair(0);
        assert_eq!(host.seal(b"x", "t").unwrap().seq, 1);
        assert_eq!(host.seal(b"y", "t").unwrap().seq, 2);
    }

    #[test]
    fn oversize_plaintext_refused_at_seal() {
        let (mut host, _) = pair(0);
        let body = vec![0u8; MAX_PLAINTEXT + 1];
        assert!(matches!(
            host.seal(&body, "t"),
            Err(ChannelError::TooLarge)
        ));
        // The counter must not have burned a sequence number.
        assert_eq!(host.seal(b"x", "t").unwrap().seq, 1);
    }

    #[test]
    fn oversize_ciphertext_refused_before_crypto() {
        let (mut host, mut enclave) = pair(0);
        let mut record = host.seal(b"x", "t").unwrap();
        record.ciphertext = vec![0u8; MAX_CIPHERTEXT + 1];
        let before = enclave.recv_aead_ops();
        assert!(matches!(
            enclave.open(&record, "t"),
            Err(ChannelError::TooLarge)
        ));
        assert_eq!(enclave.recv_aead_ops(), before);
    }

    #[test]
    fn replay_refused_before_crypto() {
        let (mut host, mut enclave) = pair(0);
        let record = host.seal(b"x", "t").unwrap();
        enclave.open(&record, "t").unwrap();
        let before = enclave.recv_aead_ops();
        assert!(matches!(
            enclave.open(&record, "t"),
            Err(ChannelError::Replay)
        ));
        assert_eq!(enclave.recv_aead_ops(), before);
    }

    #[test]
    fn tampered_outer_seq_is_a_crypto_failure() {
        let (mut host, mut enclave) = pair(0);
        let mut record = host.seal(b"x", "t").unwrap();
        record.seq = 2;
        assert!(matches!(
            enclave.open(&record, "t"),
            Err(ChannelError::Crypto(_))
        ));
    }

    #[test]
    fn strict_mode_rejects_gaps() {
        let (mut host, mut enclave) = pair(0);
        let r1 = host.seal(b"1", "t").unwrap();
        let _r2 = host.seal(b"2", "t").unwrap();
        let r3 = host.seal(b"3", "t").unwrap();
        enclave.open(&r1, "t").unwrap();
        assert!(matches!(
            enclave.open(&r3, "t"),
            Err(ChannelError::SequenceViolation)
        ));
        // The gap record must not have been committed.
        assert_eq!(enclave.last_accepted_seq(), 1);
    }

    #[test]
    fn window_mode_accepts_forward_jumps_only() {
        let (mut host, mut enclave) = pair(4);
        let r1 = host.seal(b"1", "t").unwrap();
        let r2 = host.seal(b"2", "t").unwrap();
        let r3 = host.seal(b"3", "t").unwrap();
        enclave.open(&r1, "t").unwrap();
        // Jump over 2, inside the window.
        enclave.open(&r3, "t").unwrap();
        assert_eq!(enclave.last_accepted_seq(), 3);
        // Backward delivery is out.
        assert!(matches!(
            enclave.open(&r2, "t"),
            Err(ChannelError::SequenceViolation)
        ));
    }

    #[test]
    fn window_mode_rejects_jumps_past_window() {
        let (mut host, mut enclave) = pair(2);
        for _ in 0..3 {
            host.seal(b"skip", "t").unwrap();
        }
        let r4 = host.seal(b"4", "t").unwrap();
        assert!(matches!(
            enclave.open(&r4, "t"),
            Err(ChannelError::SequenceViolation)
        ));
    }

    #[test]
    fn replay_cache_commits_accepted_nonces_only() {
        let (mut host, mut enclave) = pair(0);
        let r1 = host.seal(b"1", "t").unwrap();
        let _r2 = host.seal(b"2", "t").unwrap();
        let r3 = host.seal(b"3", "t").unwrap();
        enclave.open(&r1, "t").unwrap();
        let _ = enclave.open(&r3, "t");
        assert_eq!(enclave.replay_len(), 1);
    }

    #[test]
    fn aad_binding_holds_across_the_closed_set() {
        let (mut host, mut enclave) = pair(0);
        let record = host.seal(b"x", "tag-a").unwrap();
        let mut cross = record.clone();
        cross.aad_tag = "tag-b".into();
        // Forged framing tag: the AEAD itself refuses.
        assert!(matches!(
            enclave.open(&cross, "tag-b"),
            Err(ChannelError::Crypto(_))
        ));
        // Honest framing tag, wrong expectation: refused before crypto.
        assert!(matches!(
            enclave.open(&record, "tag-b"),
            Err(ChannelError::ContextMismatch)
        ));
    }

    #[test]
    fn context_divergence_is_silent_decryption_failure() {
        let shared = Zeroizing::new([7u8; SHARED_SECRET_LEN]);
        let ctx_host = context();
        let mut ctx_enclave = context();
        ctx_enclave.code_hash = "H'".into();
        let mut host = Session::derive(Role::Host, [1; 16], &shared, &ctx_host, 0).unwrap();
        let mut enclave =
            Session::derive(Role::Enclave, [1; 16], &shared, &ctx_enclave, 0).unwrap();
        let record = host.seal(b"x", "t").unwrap();
        assert!(matches!(
            enclave.open(&record, "t"),
            Err(ChannelError::Crypto(_))
        ));
    }
}
