//! HKDF-SHA-256 extract-then-expand. One extractor per handshake, labelled
//! expansions for keys and base nonces.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::CryptoError;

pub const KEY_LEN: usize = 32;
pub const NONCE_LEN: usize = 12;

/// A keyed HKDF extractor ready for labelled expansions.
pub struct KeySchedule(Hkdf<Sha256>);

impl KeySchedule {
    /// HKDF-Extract over (salt, ikm).
    pub fn extract(salt: &[u8], ikm: &[u8]) -> Self {
        Self(Hkdf::<Sha256>::new(Some(salt), ikm))
    }

    /// Expands a 256-bit AEAD key under `info`.
    pub fn expand_key(&self, info: &[u8]) -> Result<Zeroizing<[u8; KEY_LEN]>, CryptoError> {
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        self.0
            .expand(info, key.as_mut_slice())
            .map_err(|_| CryptoError)?;
        Ok(key)
    }

    /// Expands a 96-bit base nonce under `info`.
    pub fn expand_nonce(&self, info: &[u8]) -> Result<[u8; NONCE_LEN], CryptoError> {
        let mut nonce = [0u8; NONCE_LEN];
        self.0.expand(info, &mut nonce).map_err(|_| CryptoError)?;
        Ok(nonce)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expansion_is_deterministic() {
        let ks1 = KeySchedule::extract(b"salt", b"ikm");
        let ks2 = KeySchedule::extract(b"salt", b"ikm");
        assert_eq!(*ks1.expand_key(b"k").unwrap(), *ks2.expand_key(b"k").unwrap());
        assert_eq!(
            ks1.expand_nonce(b"n").unwrap(),
            ks2.expand_nonce(b"n").unwrap()
        );
    }

    #[test]
    fn labels_separate_outputs() {
        let ks = KeySchedule::extract(b"salt", b"ikm");
        let a = ks.expand_key(b"label-a").unwrap();
        let b = ks.expand_key(b"label-b").unwrap();
        assert_ne!(*a, *b);
    }

    #[test]
    fn salt_separates_outputs() {
        let a = KeySchedule::extract(b"salt-a", b"ikm").expand_key(b"k").unwrap();
        let b = KeySchedule::extract(b"salt-b", b"ikm").expand_key(b"k").unwrap();
        assert_ne!(*a, *b);
    }
}
