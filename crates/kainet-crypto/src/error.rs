use thiserror::Error;

/// Failures raised by key derivation and the message envelope.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Key derivation failed: {0}")]
    Derivation(&'static str),

    #[error("Encryption failed")]
    Encryption,

    #[error("Malformed envelope: {len} bytes, need at least {min}")]
    MalformedEnvelope { len: usize, min: usize },

    /// Wrong key, corrupted payload and tag mismatch all map here. The
    /// variant carries no detail on purpose.
    #[error("Decryption failed")]
    Decryption,
}
