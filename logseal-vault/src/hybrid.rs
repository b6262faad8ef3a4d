//! Hybrid per-file encryption of session recordings.
//!
//! Each recording is sealed with a fresh random session key (AES-256-CBC,
//! `Salted__` framing) and the session key is wrapped under the recipient
//! public key(s) into a sibling `.aes.enc` file. From the caller's point
//! of view encryption is all-or-nothing: artifacts are written to a temp
//! path and renamed into place, and the plaintext is deleted only after
//! both artifacts and the metadata record exist. Decryption never deletes
//! the ciphertext; replay happens from a scoped temporary copy the caller
//! purges afterwards.

use crate::error::{VaultError, VaultResult};
use crate::keystore::{load_private_key, load_public_key, write_with_mode};
use crate::path_guard::{ArtifactRole, PathGuard, CIPHERTEXT_SUFFIXES, WRAPPED_KEY_SUFFIXES};
use crate::sink::{EncryptionRecord, MetadataSink};
use crate::EncryptionConfig;
use chrono::Utc;
use logseal_crypto::{
    self as crypto, CryptoError, KeyFingerprint, RsaPublicKey, SessionKey,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Encrypted artifacts and transient plaintext: owner read/write only.
const ARTIFACT_MODE: u32 = 0o600;

/// Performs per-file hybrid encryption and decryption.
pub struct HybridCipher {
    guard: PathGuard,
    additional_keys: Vec<PathBuf>,
    sink: Option<Arc<dyn MetadataSink>>,
}

impl HybridCipher {
    pub fn new(guard: PathGuard) -> Self {
        Self {
            guard,
            additional_keys: Vec::new(),
            sink: None,
        }
    }

    /// Builds a cipher honoring the config's multi-recipient settings.
    pub fn from_config(guard: PathGuard, config: &EncryptionConfig) -> Self {
        Self {
            guard,
            additional_keys: config.extra_recipients().to_vec(),
            sink: None,
        }
    }

    /// Attaches the metadata sink consulted after successful encrypts.
    pub fn with_sink(mut self, sink: Arc<dyn MetadataSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn guard(&self) -> &PathGuard {
        &self.guard
    }

    /// Encrypts `plaintext_path` into `ciphertext_path` plus its wrapped-key
    /// sibling, then deletes the plaintext. Returns the fingerprint of the
    /// primary public key.
    ///
    /// On any failure the filesystem is left as it was before the call:
    /// partial artifacts are removed and the plaintext stays put.
    pub fn encrypt(
        &self,
        plaintext_path: &Path,
        ciphertext_path: &Path,
        public_key_path: &Path,
    ) -> VaultResult<KeyFingerprint> {
        let src = self.guard.validate(plaintext_path, ArtifactRole::Plaintext)?;
        let dst = self.guard.validate(ciphertext_path, ArtifactRole::Ciphertext)?;

        let primary = load_public_key(public_key_path)?;
        let fingerprint = KeyFingerprint::of_public_key(&primary)
            .map_err(|e| VaultError::InvalidKey(e.to_string()))?;

        let mut recipients = vec![primary];
        for extra in &self.additional_keys {
            recipients.push(load_public_key(extra)?);
        }
        let recipient_refs: Vec<&RsaPublicKey> = recipients.iter().collect();

        let content = fs::read(&src)?;
        let session_key = SessionKey::generate();
        let framed = crypto::encrypt(&session_key, &content)
            .map_err(|e| VaultError::Encrypt(e.to_string()))?;

        write_artifact(&dst, &framed)?;

        let key_path = wrapped_key_path(&dst);
        let wrap_result = crypto::wrap_session_key(&session_key, &recipient_refs)
            .map_err(|e| VaultError::Encrypt(e.to_string()))
            .and_then(|blob| write_artifact(&key_path, &blob));
        if let Err(e) = wrap_result {
            let _ = fs::remove_file(&dst);
            return Err(e);
        }

        // Bookkeeping happens before the destructive step so a sink
        // failure leaves the plaintext intact.
        let session_id = session_id_of(&src);
        if let Some(sink) = &self.sink {
            let record = EncryptionRecord {
                session_id: session_id.clone(),
                fingerprint: fingerprint.clone(),
                encrypted_at: Utc::now(),
            };
            if let Err(e) = sink.record(record) {
                let _ = fs::remove_file(&key_path);
                let _ = fs::remove_file(&dst);
                return Err(VaultError::Sink(e.to_string()));
            }
        }

        if let Err(e) = fs::remove_file(&src) {
            let _ = fs::remove_file(&key_path);
            let _ = fs::remove_file(&dst);
            return Err(VaultError::Io(e));
        }

        debug!(session = %session_id, fingerprint = %fingerprint, "encrypted recording");
        Ok(fingerprint)
    }

    /// Decrypts `ciphertext_path` into `plaintext_path` using the private
    /// key. The ciphertext and wrapped key are left in place.
    pub fn decrypt(
        &self,
        ciphertext_path: &Path,
        plaintext_path: &Path,
        private_key_path: &Path,
    ) -> VaultResult<()> {
        self.decrypt_inner(ciphertext_path, plaintext_path, private_key_path, None)
    }

    /// Like [`Self::decrypt`], but first checks the recorded fingerprint
    /// against the supplied private key and refuses on mismatch. Catches
    /// the decrypt-after-rotation mistake before any unwrap attempt.
    pub fn decrypt_verified(
        &self,
        ciphertext_path: &Path,
        plaintext_path: &Path,
        private_key_path: &Path,
        recorded: &KeyFingerprint,
    ) -> VaultResult<()> {
        self.decrypt_inner(
            ciphertext_path,
            plaintext_path,
            private_key_path,
            Some(recorded),
        )
    }

    fn decrypt_inner(
        &self,
        ciphertext_path: &Path,
        plaintext_path: &Path,
        private_key_path: &Path,
        recorded: Option<&KeyFingerprint>,
    ) -> VaultResult<()> {
        let ct = self.guard.validate(ciphertext_path, ArtifactRole::Ciphertext)?;
        let out = self.guard.validate(plaintext_path, ArtifactRole::Plaintext)?;

        // Ordered naming strategies: current suffix first, then the
        // legacy one written by pre-migration versions.
        let key_path = WRAPPED_KEY_SUFFIXES
            .iter()
            .map(|suffix| append_suffix(&ct, suffix))
            .find(|candidate| candidate.exists())
            .ok_or_else(|| VaultError::KeyNotFound(wrapped_key_path(&ct)))?;
        if key_path != wrapped_key_path(&ct) {
            debug!(path = %key_path.display(), "using legacy wrapped-key suffix");
        }
        let key_path = self.guard.validate(&key_path, ArtifactRole::WrappedKey)?;

        let private = load_private_key(private_key_path)?;

        if let Some(recorded) = recorded {
            let active = KeyFingerprint::of_public_key(&RsaPublicKey::from(&private))
                .map_err(|e| VaultError::InvalidKey(e.to_string()))?;
            if *recorded != active {
                return Err(VaultError::FingerprintMismatch {
                    recorded: recorded.to_string(),
                    active: active.to_string(),
                });
            }
        }

        let blob = fs::read(&key_path)?;
        let session_key = crypto::unwrap_session_key(&blob, &private).map_err(|e| match e {
            CryptoError::KeyMismatch => VaultError::KeyMismatch,
            other => VaultError::Decrypt(other.to_string()),
        })?;

        let framed = fs::read(&ct)?;
        let content = crypto::decrypt(&session_key, &framed)
            .map_err(|e| VaultError::Decrypt(e.to_string()))?;

        write_artifact(&out, &content)?;
        debug!(session = %session_id_of(&ct), "decrypted recording");
        Ok(())
    }
}

/// The wrapped-key path written next to a ciphertext.
pub fn wrapped_key_path(ciphertext: &Path) -> PathBuf {
    append_suffix(ciphertext, WRAPPED_KEY_SUFFIXES[0])
}

/// The legacy wrapped-key path, kept only for the migration shim.
pub fn legacy_wrapped_key_path(ciphertext: &Path) -> PathBuf {
    append_suffix(ciphertext, WRAPPED_KEY_SUFFIXES[1])
}

/// The plaintext path a ciphertext decrypts back to (`.enc` stripped).
pub fn plaintext_path_for(ciphertext: &Path) -> Option<PathBuf> {
    let name = ciphertext.file_name()?.to_str()?;
    let stripped = name.strip_suffix(".enc")?;
    Some(ciphertext.with_file_name(stripped))
}

/// Session identifier of a recording path: the file name up to the first
/// dot (`abc123.log.enc` -> `abc123`).
pub fn session_id_of(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.split('.').next().unwrap_or(n))
        .unwrap_or_default()
        .to_string()
}

/// Whether the file name follows the encrypted-artifact convention.
pub fn has_encrypted_extension(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| CIPHERTEXT_SUFFIXES.iter().any(|s| n.ends_with(s)))
        .unwrap_or(false)
}

/// Whether the file content carries the `Salted__` frame prefix.
///
/// Agrees with [`has_encrypted_extension`] for artifacts this module
/// writes; both detection strategies are accepted.
pub fn has_salted_magic(path: &Path) -> VaultResult<bool> {
    use std::io::Read;
    let mut prefix = [0u8; 16];
    let mut file = fs::File::open(path)?;
    let mut filled = 0;
    while filled < prefix.len() {
        match file.read(&mut prefix[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(crypto::is_salted_frame(&prefix[..filled]))
}

fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(suffix);
    PathBuf::from(os)
}

/// Writes `bytes` with owner-only permissions via a temp sibling and a
/// rename, so a crash or failure never leaves a partial artifact at the
/// final path.
fn write_artifact(path: &Path, bytes: &[u8]) -> VaultResult<()> {
    let tmp = append_suffix(path, ".tmp");
    if let Err(e) = write_with_mode(&tmp, bytes, ARTIFACT_MODE) {
        let _ = fs::remove_file(&tmp);
        return Err(VaultError::Io(e));
    }
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(VaultError::Io(e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapped_key_path_uses_current_suffix() {
        assert_eq!(
            wrapped_key_path(Path::new("/logs/s1.log.enc")),
            Path::new("/logs/s1.log.enc.aes.enc")
        );
    }

    #[test]
    fn plaintext_path_strips_enc() {
        assert_eq!(
            plaintext_path_for(Path::new("/logs/s1.timing.enc")),
            Some(PathBuf::from("/logs/s1.timing"))
        );
        assert_eq!(plaintext_path_for(Path::new("/logs/s1.timing")), None);
    }

    #[test]
    fn session_id_stops_at_first_dot() {
        assert_eq!(session_id_of(Path::new("/logs/abc123.log.enc")), "abc123");
        assert_eq!(session_id_of(Path::new("abc123.timing")), "abc123");
    }

    #[test]
    fn encrypted_extension_detection() {
        assert!(has_encrypted_extension(Path::new("a.log.enc")));
        assert!(has_encrypted_extension(Path::new("a.timing.enc")));
        assert!(!has_encrypted_extension(Path::new("a.log")));
    }

    #[test]
    fn salted_magic_detection_reads_the_full_prefix() {
        let dir = tempfile::TempDir::new().unwrap();

        // Shorter than a full frame header
        let short = dir.path().join("short.log");
        fs::write(&short, b"Salted_").unwrap();
        assert!(!has_salted_magic(&short).unwrap());

        // Exactly magic + salt, nothing after
        let exact = dir.path().join("exact.log");
        fs::write(&exact, b"Salted__12345678").unwrap();
        assert!(has_salted_magic(&exact).unwrap());

        let plain = dir.path().join("plain.log");
        fs::write(&plain, b"interactive session log").unwrap();
        assert!(!has_salted_magic(&plain).unwrap());
    }
}
