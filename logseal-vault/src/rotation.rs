//! Key rotation across a corpus of encrypted recordings.
//!
//! State machine: `Idle -> KeysBackedUp -> NewKeysGenerated -> Reencrypting
//! -> Done | RolledBack`. The current pair is backed up before anything is
//! mutated, and old keys are preserved until the caller confirms success,
//! so no session ever becomes permanently undecryptable because a rotation
//! went wrong. Individual file failures are isolated: one corrupt file
//! must not strand the rest of the corpus on the old key.

use crate::error::{VaultError, VaultResult};
use crate::hybrid::{legacy_wrapped_key_path, plaintext_path_for, HybridCipher};
use crate::keystore::{KeyStore, OverwritePolicy};
use logseal_crypto::KeyFingerprint;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Key-pair operations rotation depends on.
///
/// Implemented by [`KeyStore`]; injected so the failure legs of the
/// state machine can be driven by a store that fails on demand.
pub trait RotationKeys {
    fn backup_to(&self, backup_root: &Path) -> VaultResult<PathBuf>;
    fn restore_from(&self, backup_dir: &Path) -> VaultResult<()>;
    fn generate(&self, policy: OverwritePolicy) -> VaultResult<KeyFingerprint>;
    fn private_path(&self) -> &Path;
    fn public_path(&self) -> &Path;
}

impl RotationKeys for KeyStore {
    fn backup_to(&self, backup_root: &Path) -> VaultResult<PathBuf> {
        KeyStore::backup_to(self, backup_root)
    }

    fn restore_from(&self, backup_dir: &Path) -> VaultResult<()> {
        KeyStore::restore_from(self, backup_dir)
    }

    fn generate(&self, policy: OverwritePolicy) -> VaultResult<KeyFingerprint> {
        KeyStore::generate(self, policy)
    }

    fn private_path(&self) -> &Path {
        KeyStore::private_path(self)
    }

    fn public_path(&self) -> &Path {
        KeyStore::public_path(self)
    }
}

/// Phases of a rotation run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RotationState {
    Idle,
    KeysBackedUp,
    NewKeysGenerated,
    Reencrypting,
    Done,
    RolledBack,
}

/// One file that could not be migrated to the new key.
#[derive(Clone, Debug, Serialize)]
pub struct RotationFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of a completed rotation, including partial successes.
#[derive(Debug, Serialize)]
pub struct RotationReport {
    /// Fingerprint of the newly active public key.
    pub new_fingerprint: KeyFingerprint,
    /// Where the superseded pair was preserved.
    pub backup_dir: PathBuf,
    /// Files now protected by the new key.
    pub migrated: Vec<PathBuf>,
    /// Files still decryptable only with the backed-up old key.
    pub failed: Vec<RotationFailure>,
}

impl RotationReport {
    /// Whether every manifest entry migrated.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Drives re-encryption of existing recordings under a fresh key pair.
pub struct RotationCoordinator<S = KeyStore> {
    keystore: S,
    cipher: HybridCipher,
    backup_root: PathBuf,
    state: RotationState,
}

impl<S: RotationKeys> RotationCoordinator<S> {
    pub fn new(keystore: S, cipher: HybridCipher, backup_root: impl Into<PathBuf>) -> Self {
        Self {
            keystore,
            cipher,
            backup_root: backup_root.into(),
            state: RotationState::Idle,
        }
    }

    pub fn state(&self) -> RotationState {
        self.state
    }

    /// Rotates the active key pair and re-encrypts every ciphertext in
    /// `manifest` under the new key.
    ///
    /// Backup or generation failures abort the whole run with the
    /// original pair in place (`RolledBack`). Per-file failures during
    /// re-encryption are collected into the report instead of halting
    /// the batch; those files remain readable with the backed-up key.
    pub fn rotate(&mut self, manifest: &[PathBuf]) -> VaultResult<RotationReport> {
        self.state = RotationState::Idle;

        let backup_dir = match self.keystore.backup_to(&self.backup_root) {
            Ok(dir) => dir,
            Err(e) => {
                self.state = RotationState::RolledBack;
                return Err(e);
            }
        };
        self.state = RotationState::KeysBackedUp;

        let old_private = {
            let name = self
                .keystore
                .private_path()
                .file_name()
                .ok_or_else(|| VaultError::Backup("private key path has no file name".into()))?;
            backup_dir.join(name)
        };

        let new_fingerprint = match self.keystore.generate(OverwritePolicy::Force) {
            Ok(fp) => fp,
            Err(e) => {
                self.state = RotationState::RolledBack;
                if let Err(restore_err) = self.keystore.restore_from(&backup_dir) {
                    warn!(error = %restore_err, "restore after failed generation also failed; backup remains at {}", backup_dir.display());
                }
                return Err(e);
            }
        };
        self.state = RotationState::NewKeysGenerated;

        self.state = RotationState::Reencrypting;
        let mut migrated = Vec::new();
        let mut failed = Vec::new();
        for ciphertext in manifest {
            match self.migrate_one(ciphertext, &old_private) {
                Ok(()) => migrated.push(ciphertext.clone()),
                Err(e) => {
                    warn!(path = %ciphertext.display(), error = %e, "recording not migrated, still on old key");
                    failed.push(RotationFailure {
                        path: ciphertext.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        self.state = RotationState::Done;
        debug!(
            migrated = migrated.len(),
            failed = failed.len(),
            fingerprint = %new_fingerprint,
            "rotation finished"
        );
        Ok(RotationReport {
            new_fingerprint,
            backup_dir,
            migrated,
            failed,
        })
    }

    /// Decrypt under the old key, re-encrypt under the new one, purge the
    /// transient plaintext. The ciphertext path is only replaced by the
    /// all-or-nothing encrypt, so a failure leaves the old-key artifact
    /// intact.
    fn migrate_one(&self, ciphertext: &Path, old_private: &Path) -> VaultResult<()> {
        let plaintext = plaintext_path_for(ciphertext).ok_or_else(|| {
            VaultError::PathViolation(format!(
                "{} is not an encrypted recording",
                ciphertext.display()
            ))
        })?;

        self.cipher.decrypt(ciphertext, &plaintext, old_private)?;

        let encrypted = self
            .cipher
            .encrypt(&plaintext, ciphertext, self.keystore.public_path());
        if encrypted.is_err() {
            // Encrypt did not consume the transient plaintext; purge it.
            let _ = fs::remove_file(&plaintext);
        }
        encrypted?;

        // The fresh wrapped key uses the current suffix; drop a stale
        // legacy-suffix file so future probes cannot find old-key material.
        let legacy = legacy_wrapped_key_path(ciphertext);
        if legacy.exists() {
            let _ = fs::remove_file(&legacy);
            debug!(path = %legacy.display(), "removed legacy wrapped-key file");
        }
        Ok(())
    }
}
