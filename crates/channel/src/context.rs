//! Handshake transcript. Both sides assemble the same context from what
//! they independently know plus what the handshake carried, and feed its
//! salt into the key schedule. Any disagreement (origin, code hash, nonce,
//! public key) lands both peers on unrelated keys, so the mismatch shows up
//! only as decryption failure later.

pub const HANDSHAKE_NONCE_LEN: usize = 16;
pub const SESSION_ID_LEN: usize = 16;

pub struct HandshakeContext {
    pub host_origin: String,
    pub enclave_origin: String,
    pub code_hash: String,
    pub nonce_host: [u8; HANDSHAKE_NONCE_LEN],
    pub nonce_enclave: [u8; HANDSHAKE_NONCE_LEN],
    pub host_pub: Vec<u8>,
    pub enclave_pub: Vec<u8>,
}

impl HandshakeContext {
    /// `nonce_host || nonce_enclave || SHA-256(origins | code_hash | pubs)`.
    ///
    /// Field values are length-delimited inside the hash so no two distinct
    /// contexts can collide by shifting bytes across a boundary.
    pub fn transcript_salt(&self) -> Vec<u8> {
        let digest = crypto::sha256(&[
            &(self.host_origin.len() as u64).to_be_bytes(),
            self.host_origin.as_bytes(),
            &(self.enclave_origin.len() as u64).to_be_bytes(),
            self.enclave_origin.as_bytes(),
            &(self.code_hash.len() as u64).to_be_bytes(),
            self.code_hash.as_bytes(),
            &self.host_pub,
            &self.enclave_pub,
        ]);
        let mut salt = Vec::with_capacity(2 * HANDSHAKE_NONCE_LEN + digest.len());
        salt.extend_from_slice(&self.nonce_host);
        salt.extend_from_slice(&self.nonce_enclave);
        salt.extend_from_slice(&digest);
        salt
    }
}
