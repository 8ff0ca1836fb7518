//! Size caps and counter bounds. Sizes are checked fail-fast, before any
//! crypto work touches a record.

/// Largest ciphertext (tag included) a peer will look at.
pub const MAX_CIPHERTEXT: usize = 1 << 20;

/// Largest serialized plaintext body, either direction.
pub const MAX_PLAINTEXT: usize = 256 * 1024;

/// Largest `evaluate` source accepted by the enclave.
pub const MAX_CODE: usize = 128 * 1024;

/// Received nonces retained for replay detection.
pub const MAX_REPLAY_CACHE: usize = 4096;

/// Hard ceiling on sequence numbers; reaching it tears the session down
/// long before the u64 space could wrap.
pub const SEQ_LIMIT: u64 = 1 << 63;

/// Upper bound on an encoded wire frame: the ciphertext cap plus header
/// fields and serialization overhead.
pub const MAX_WIRE_FRAME: usize = MAX_CIPHERTEXT + 512;
