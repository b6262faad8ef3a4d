//! Vault error types.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for vault operations.
pub type VaultResult<T> = Result<T, VaultError>;

/// Errors that can occur while protecting or recovering recordings.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Path escapes the log root or violates the naming convention.
    /// Always fatal to the single operation, never retried.
    #[error("path violation: {0}")]
    PathViolation(String),

    #[error("key file not found: {0}")]
    KeyNotFound(PathBuf),

    #[error("invalid key material: {0}")]
    InvalidKey(String),

    /// Refusal to overwrite an existing key pair without an explicit
    /// force flag.
    #[error("key pair already exists at {0}, refusing to overwrite")]
    KeyExists(PathBuf),

    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    #[error("encryption failed: {0}")]
    Encrypt(String),

    #[error("decryption failed: {0}")]
    Decrypt(String),

    /// The private key cannot unwrap the recording's session key.
    #[error("wrapped key does not match the supplied private key")]
    KeyMismatch,

    /// The recorded fingerprint does not match the active private key.
    /// Raised before any unwrap attempt.
    #[error("fingerprint mismatch: recording was protected by {recorded}, active key is {active}")]
    FingerprintMismatch { recorded: String, active: String },

    #[error("key backup failed: {0}")]
    Backup(String),

    #[error("metadata sink error: {0}")]
    Sink(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
