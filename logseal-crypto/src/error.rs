//! Crypto error types.

use thiserror::Error;

/// Result type for cryptographic operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur in the encryption primitives.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    #[error("invalid key material: {0}")]
    InvalidKey(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("decryption failed: {0}")]
    Decryption(String),

    /// The wrapped session key could not be recovered with the supplied
    /// private key. Distinct from [`CryptoError::Decryption`] so callers
    /// can give an actionable "wrong key" message.
    #[error("wrapped key does not match the supplied private key")]
    KeyMismatch,

    #[error("input is not a salted cipher frame")]
    InvalidFrame,

    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },
}
