//! Primitive wrappers for the enclave channel: P-256 ECDH, HKDF-SHA-256,
//! AES-256-GCM, SHA-256, OS randomness, constant-time comparison and
//! best-effort wiping.
//!
//! Every failure collapses into the opaque [`CryptoError`]; callers get no
//! sub-kind to branch on.

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

pub mod aead;
pub mod ecdh;
pub mod kdf;

/// Opaque failure of any primitive: bad point, bad tag, short KDF output.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("cryptographic operation failed")]
pub struct CryptoError;

/// Fills `out` from the OS RNG.
pub fn fill_random(out: &mut [u8]) {
    OsRng.fill_bytes(out);
}

/// Returns `N` bytes from the OS RNG.
pub fn secure_random<const N: usize>() -> [u8; N] {
    let mut out = [0u8; N];
    fill_random(&mut out);
    out
}

/// SHA-256 over the concatenation of `parts`.
pub fn sha256(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Constant-time equality. Length mismatch returns false without touching
/// the contents.
pub fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && bool::from(a.ct_eq(b))
}

/// Best-effort overwrite of a sensitive buffer.
pub fn wipe(buf: &mut [u8]) {
    buf.zeroize();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_matches_known_vector() {
        // SHA-256("abc")
        let digest = sha256(&[b"a", b"bc"]);
        assert_eq!(
            hex::encode(digest),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn ct_eq_handles_length_mismatch() {
        assert!(ct_eq(b"same", b"same"));
        assert!(!ct_eq(b"same", b"samee"));
        assert!(!ct_eq(b"same", b"sbme"));
        assert!(ct_eq(b"", b""));
    }

    #[test]
    fn wipe_overwrites() {
        let mut buf = *b"secret material";
        wipe(&mut buf);
        assert_eq!(buf, [0u8; 15]);
    }

    #[test]
    fn secure_random_is_not_constant() {
        let a = secure_random::<16>();
        let b = secure_random::<16>();
        assert_ne!(a, b);
    }
}
