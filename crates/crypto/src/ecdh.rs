//! Ephemeral ECDH over P-256. Public keys travel as SEC1 uncompressed
//! points (65 bytes); both peers must use the same serialization.

use p256::ecdh::EphemeralSecret;
use p256::{EncodedPoint, PublicKey};
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use crate::CryptoError;

/// SEC1 uncompressed point: 0x04 || x || y.
pub const PUBLIC_KEY_LEN: usize = 65;

/// Shared-secret length (the x coordinate).
pub const SHARED_SECRET_LEN: usize = 32;

/// One-use ECDH keypair. Consumed by [`EcdhKeyPair::diffie_hellman`] so a
/// secret cannot be reused across handshakes.
pub struct EcdhKeyPair {
    secret: EphemeralSecret,
    public: PublicKey,
}

impl EcdhKeyPair {
    pub fn generate() -> Self {
        let secret = EphemeralSecret::random(&mut OsRng);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// The local public key in SEC1 uncompressed form.
    pub fn public_key_sec1(&self) -> Vec<u8> {
        EncodedPoint::from(self.public).as_bytes().to_vec()
    }

    /// Derives the 32-byte shared secret against a peer SEC1 public key.
    pub fn diffie_hellman(
        self,
        peer_sec1: &[u8],
    ) -> Result<Zeroizing<[u8; SHARED_SECRET_LEN]>, CryptoError> {
        let peer = import_public_key(peer_sec1)?;
        let shared = self.secret.diffie_hellman(&peer);
        let mut out = Zeroizing::new([0u8; SHARED_SECRET_LEN]);
        out.copy_from_slice(shared.raw_secret_bytes().as_slice());
        Ok(out)
    }
}

/// Parses a SEC1 uncompressed P-256 point, rejecting every other encoding.
pub fn import_public_key(sec1: &[u8]) -> Result<PublicKey, CryptoError> {
    if sec1.len() != PUBLIC_KEY_LEN || sec1[0] != 0x04 {
        return Err(CryptoError);
    }
    PublicKey::from_sec1_bytes(sec1).map_err(|_| CryptoError)
}
