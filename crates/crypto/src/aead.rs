//! AES-256-GCM with explicit 12-byte nonces and AAD. The cipher keeps a
//! running operation counter so callers can assert how much AEAD work a
//! record actually triggered.

use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::Aes256Gcm;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::CryptoError;

pub const KEY_LEN: usize = 32;
pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;

pub struct AeadCipher {
    cipher: Aes256Gcm,
    ops: AtomicU64,
}

impl AeadCipher {
    pub fn new(key: &[u8; KEY_LEN]) -> Self {
        Self {
            cipher: Aes256Gcm::new(GenericArray::from_slice(key)),
            ops: AtomicU64::new(0),
        }
    }

    /// Encrypts `plaintext` under `nonce`/`aad`; the 16-byte tag is appended
    /// to the returned ciphertext.
    pub fn seal(
        &self,
        nonce: &[u8; NONCE_LEN],
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        self.ops.fetch_add(1, Ordering::Relaxed);
        self.cipher
            .encrypt(
                GenericArray::from_slice(nonce),
                Payload { msg: plaintext, aad },
            )
            .map_err(|_| CryptoError)
    }

    /// Decrypts and authenticates `ciphertext` (tag included).
    pub fn open(
        &self,
        nonce: &[u8; NONCE_LEN],
        aad: &[u8],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        self.ops.fetch_add(1, Ordering::Relaxed);
        self.cipher
            .decrypt(
                GenericArray::from_slice(nonce),
                Payload { msg: ciphertext, aad },
            )
            .map_err(|_| CryptoError)
    }

    /// Number of seal/open attempts made through this cipher.
    pub fn ops(&self) -> u64 {
        self.ops.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secure_random;

    #[test]
    fn roundtrip_with_aad() {
        let key = secure_random::<KEY_LEN>();
        let cipher = AeadCipher::new(&key);
        let nonce = secure_random::<NONCE_LEN>();

        let ct = cipher.seal(&nonce, b"ctx", b"hello").unwrap();
        assert_eq!(ct.len(), 5 + TAG_LEN);
        let pt = cipher.open(&nonce, b"ctx", &ct).unwrap();
        assert_eq!(pt, b"hello");
    }

    #[test]
    fn aad_mismatch_fails() {
        let key = secure_random::<KEY_LEN>();
        let cipher = AeadCipher::new(&key);
        let nonce = [7u8; NONCE_LEN];
        let ct = cipher.seal(&nonce, b"ctx-a", b"hello").unwrap();
        assert_eq!(cipher.open(&nonce, b"ctx-b", &ct), Err(CryptoError));
    }

    #[test]
    fn tamper_fails_opaquely() {
        let key = secure_random::<KEY_LEN>();
        let cipher = AeadCipher::new(&key);
        let nonce = [1u8; NONCE_LEN];
        let mut ct = cipher.seal(&nonce, b"", b"payload").unwrap();
        ct[0] ^= 0xff;
        assert_eq!(cipher.open(&nonce, b"", &ct), Err(CryptoError));
    }

    #[test]
    fn wrong_key_fails_opaquely() {
        let cipher_a = AeadCipher::new(&secure_random::<KEY_LEN>());
        let cipher_b = AeadCipher::new(&secure_random::<KEY_LEN>());
        let nonce = [2u8; NONCE_LEN];
        let ct = cipher_a.seal(&nonce, b"", b"payload").unwrap();
        assert_eq!(cipher_b.open(&nonce, b"", &ct), Err(CryptoError));
    }

    #[test]
    fn op_counter_tracks_attempts() {
        let cipher = AeadCipher::new(&secure_random::<KEY_LEN>());
        assert_eq!(cipher.ops(), 0);
        let nonce = [3u8; NONCE_LEN];
        let ct = cipher.seal(&nonce, b"", b"x").unwrap();
        let _ = cipher.open(&nonce, b"", &ct);
        let _ = cipher.open(&nonce, b"wrong", &ct);
        assert_eq!(cipher.ops(), 3);
    }
}
