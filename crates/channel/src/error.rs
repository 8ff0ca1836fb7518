use crypto::CryptoError;

/// Channel failure taxonomy. Crypto-layer failures stay opaque: every AEAD
/// or key problem surfaces as the single [`CryptoError`] with no sub-kind.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("malformed handshake message")]
    MalformedHello,

    #[error("context mismatch")]
    ContextMismatch,

    #[error("replayed record")]
    Replay,

    #[error("sequence violation")]
    SequenceViolation,

    #[error("record exceeds size cap")]
    TooLarge,

    #[error("sequence counter exhausted")]
    SequenceExhausted,

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("malformed wire record")]
    MalformedRecord,

    #[error("malformed payload body")]
    MalformedPayload,

    #[error("handler deadline exceeded")]
    Timeout,

    #[error("handler failed: {0}")]
    Handler(String),

    #[error("plaintext egress blocked")]
    EgressViolation,

    #[error("session closed")]
    Closed,
}
