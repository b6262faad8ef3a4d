//! At-rest protection for logseal session recordings.
//!
//! The session recorder hands finished `.log`/`.timing` files to this
//! crate; the replayer asks for them back. In between:
//!
//! - [`PathGuard`] proves every candidate path is canonically contained
//!   in the log root and named for its role before any crypto runs.
//! - [`KeyStore`] owns the RSA key pair files: generation, permissions,
//!   fingerprints, backups.
//! - [`HybridCipher`] seals each recording with a fresh session key and
//!   wraps that key under the recipient public key(s), all-or-nothing.
//! - [`RotationCoordinator`] re-encrypts an existing corpus under a new
//!   pair with backup-before-mutate semantics.
//!
//! Durable bookkeeping (which fingerprint protected which session) is
//! delegated to a caller-supplied [`MetadataSink`]. Execution is
//! single-threaded and synchronous; callers serialize per-session work.

mod config;
mod error;
pub mod hybrid;
mod keystore;
mod path_guard;
mod rotation;
mod sink;

pub use config::{EncryptionConfig, EncryptionMethod};
pub use error::{VaultError, VaultResult};
pub use hybrid::{
    has_encrypted_extension, has_salted_magic, plaintext_path_for, session_id_of,
    wrapped_key_path, HybridCipher,
};
pub use keystore::{
    load_private_key, load_public_key, KeyStore, OverwritePolicy, PRIVATE_KEY_FILE,
    PUBLIC_KEY_FILE,
};
pub use path_guard::{
    ArtifactRole, PathGuard, CIPHERTEXT_SUFFIXES, PLAINTEXT_SUFFIXES, WRAPPED_KEY_SUFFIXES,
};
pub use rotation::{
    RotationCoordinator, RotationFailure, RotationKeys, RotationReport, RotationState,
};
pub use sink::{EncryptionRecord, MemorySink, MetadataSink, SinkError, SinkResult};
