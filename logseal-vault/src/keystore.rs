//! RSA key pair lifecycle on disk.
//!
//! Owns the private/public PEM file pair used for envelope encryption:
//! generation with correct permission bits, validation, fingerprinting,
//! location resolution, and the timestamped backup/restore used by
//! rotation. Files are created with their final mode, never chmod'd
//! after the fact.

use crate::config::EncryptionConfig;
use crate::error::{VaultError, VaultResult};
use logseal_crypto::{
    generate_keypair, private_key_from_pem, private_key_to_pem, public_key_from_pem,
    public_key_to_pem, CryptoError, KeyFingerprint, RsaPrivateKey, RsaPublicKey,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default private key file name inside the key directory.
pub const PRIVATE_KEY_FILE: &str = "logseal_rsa.pem";

/// Default public key file name inside the key directory.
pub const PUBLIC_KEY_FILE: &str = "logseal_rsa.pub.pem";

/// Private key: owner read/write only.
const PRIVATE_KEY_MODE: u32 = 0o600;

/// Public key: world-readable.
const PUBLIC_KEY_MODE: u32 = 0o644;

/// Whether `generate` may replace an existing pair.
///
/// Overwriting must be an explicit decision: the interactive caller
/// confirms with the operator, non-interactive callers pass `Force`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverwritePolicy {
    Refuse,
    Force,
}

/// Manages one private/public key file pair.
#[derive(Clone, Debug)]
pub struct KeyStore {
    private_path: PathBuf,
    public_path: PathBuf,
}

impl KeyStore {
    pub fn new(private_path: impl Into<PathBuf>, public_path: impl Into<PathBuf>) -> Self {
        Self {
            private_path: private_path.into(),
            public_path: public_path.into(),
        }
    }

    /// Resolves configured key locations, falling back to the defaults
    /// under `default_dir`.
    pub fn from_config(config: &EncryptionConfig, default_dir: &Path) -> Self {
        Self {
            private_path: config
                .private_key
                .clone()
                .unwrap_or_else(|| default_dir.join(PRIVATE_KEY_FILE)),
            public_path: config
                .public_key
                .clone()
                .unwrap_or_else(|| default_dir.join(PUBLIC_KEY_FILE)),
        }
    }

    /// Resolved key locations. Never fails: decrypt callers decide how to
    /// react to an absent private key.
    pub fn locate_active(&self) -> (&Path, &Path) {
        (&self.private_path, &self.public_path)
    }

    pub fn private_path(&self) -> &Path {
        &self.private_path
    }

    pub fn public_path(&self) -> &Path {
        &self.public_path
    }

    /// Generates a fresh 2048-bit pair and writes both PEM files.
    ///
    /// The private key lands with mode 0600, the public key 0644. If the
    /// public half cannot be produced, the freshly written private key is
    /// deleted so no orphaned half-state remains.
    pub fn generate(&self, policy: OverwritePolicy) -> VaultResult<KeyFingerprint> {
        if policy == OverwritePolicy::Refuse {
            if self.private_path.exists() {
                return Err(VaultError::KeyExists(self.private_path.clone()));
            }
            if self.public_path.exists() {
                return Err(VaultError::KeyExists(self.public_path.clone()));
            }
        }

        for path in [&self.private_path, &self.public_path] {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
        }

        let pair = generate_keypair().map_err(map_crypto)?;
        let private_pem = private_key_to_pem(&pair.private).map_err(map_crypto)?;
        write_with_mode(&self.private_path, private_pem.as_bytes(), PRIVATE_KEY_MODE)?;

        let public_result = public_key_to_pem(&pair.public)
            .map_err(map_crypto)
            .and_then(|pem| {
                write_with_mode(&self.public_path, pem.as_bytes(), PUBLIC_KEY_MODE)
                    .map_err(VaultError::from)
            });
        if let Err(e) = public_result {
            // No orphaned half-state
            let _ = fs::remove_file(&self.private_path);
            return Err(e);
        }

        let fingerprint = KeyFingerprint::of_public_key(&pair.public).map_err(map_crypto)?;
        debug!(fingerprint = %fingerprint, path = %self.public_path.display(), "generated key pair");
        Ok(fingerprint)
    }

    /// Confirms the public key file exists and parses as PEM.
    pub fn validate_public(&self) -> VaultResult<()> {
        load_public_key(&self.public_path).map(|_| ())
    }

    /// Fingerprint of the active public key.
    pub fn fingerprint(&self) -> VaultResult<KeyFingerprint> {
        let public = load_public_key(&self.public_path)?;
        KeyFingerprint::of_public_key(&public).map_err(map_crypto)
    }

    /// Copies the current pair into a timestamped directory under
    /// `backup_root`, returning the backup directory. Both halves must
    /// exist; rotation has nothing to re-encrypt without them.
    pub fn backup_to(&self, backup_root: &Path) -> VaultResult<PathBuf> {
        for path in [&self.private_path, &self.public_path] {
            if !path.exists() {
                return Err(VaultError::Backup(format!(
                    "{} does not exist",
                    path.display()
                )));
            }
        }

        let stamp = chrono::Utc::now().format("%Y%m%d-%H%M%S");
        let backup_dir = backup_root.join(format!("keys-{stamp}"));
        fs::create_dir_all(&backup_dir).map_err(|e| VaultError::Backup(e.to_string()))?;

        for path in [&self.private_path, &self.public_path] {
            let name = path
                .file_name()
                .ok_or_else(|| VaultError::Backup(format!("{} has no file name", path.display())))?;
            // fs::copy preserves permission bits on unix
            fs::copy(path, backup_dir.join(name)).map_err(|e| VaultError::Backup(e.to_string()))?;
        }

        debug!(dir = %backup_dir.display(), "backed up key pair");
        Ok(backup_dir)
    }

    /// Restores the pair previously saved by [`Self::backup_to`].
    pub fn restore_from(&self, backup_dir: &Path) -> VaultResult<()> {
        for path in [&self.private_path, &self.public_path] {
            let name = path
                .file_name()
                .ok_or_else(|| VaultError::Backup(format!("{} has no file name", path.display())))?;
            let saved = backup_dir.join(name);
            fs::copy(&saved, path).map_err(|e| {
                VaultError::Backup(format!("restore of {} failed: {e}", saved.display()))
            })?;
        }
        debug!(dir = %backup_dir.display(), "restored key pair from backup");
        Ok(())
    }
}

/// Reads and parses a PEM public key.
pub fn load_public_key(path: &Path) -> VaultResult<RsaPublicKey> {
    if !path.exists() {
        return Err(VaultError::KeyNotFound(path.to_path_buf()));
    }
    let pem = fs::read_to_string(path)?;
    public_key_from_pem(&pem).map_err(map_crypto)
}

/// Reads and parses a PEM private key.
pub fn load_private_key(path: &Path) -> VaultResult<RsaPrivateKey> {
    if !path.exists() {
        return Err(VaultError::KeyNotFound(path.to_path_buf()));
    }
    let pem = fs::read_to_string(path)?;
    private_key_from_pem(&pem).map_err(map_crypto)
}

fn map_crypto(e: CryptoError) -> VaultError {
    match e {
        CryptoError::KeyGeneration(msg) => VaultError::KeyGeneration(msg),
        CryptoError::KeyMismatch => VaultError::KeyMismatch,
        CryptoError::InvalidKey(msg) => VaultError::InvalidKey(msg),
        other => VaultError::InvalidKey(other.to_string()),
    }
}

/// Creates (or replaces) `path` with `mode` applied at creation time, so
/// the content is never observable under looser permissions.
#[cfg(unix)]
pub(crate) fn write_with_mode(path: &Path, bytes: &[u8], mode: u32) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(mode)
        .open(path)?;
    file.write_all(bytes)
}

#[cfg(not(unix))]
pub(crate) fn write_with_mode(path: &Path, bytes: &[u8], _mode: u32) -> std::io::Result<()> {
    fs::write(path, bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &Path) -> KeyStore {
        KeyStore::new(dir.join(PRIVATE_KEY_FILE), dir.join(PUBLIC_KEY_FILE))
    }

    #[test]
    fn generate_writes_both_halves_with_expected_modes() {
        let dir = TempDir::new().unwrap();
        let store = store_in(dir.path());
        store.generate(OverwritePolicy::Refuse).unwrap();

        assert!(store.private_path().exists());
        assert!(store.public_path().exists());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let private = fs::metadata(store.private_path()).unwrap().permissions().mode();
            let public = fs::metadata(store.public_path()).unwrap().permissions().mode();
            assert_eq!(private & 0o777, 0o600);
            assert_eq!(public & 0o777, 0o644);
        }
    }

    #[test]
    fn refuses_to_overwrite_without_force() {
        let dir = TempDir::new().unwrap();
        let store = store_in(dir.path());
        let first = store.generate(OverwritePolicy::Refuse).unwrap();

        assert!(matches!(
            store.generate(OverwritePolicy::Refuse),
            Err(VaultError::KeyExists(_))
        ));
        // Existing pair untouched by the refusal
        assert_eq!(store.fingerprint().unwrap(), first);

        let second = store.generate(OverwritePolicy::Force).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn fingerprint_is_deterministic() {
        let dir = TempDir::new().unwrap();
        let store = store_in(dir.path());
        let generated = store.generate(OverwritePolicy::Refuse).unwrap();
        assert_eq!(store.fingerprint().unwrap(), generated);
        assert_eq!(store.fingerprint().unwrap(), store.fingerprint().unwrap());
    }

    #[test]
    fn validate_public_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let store = store_in(dir.path());

        assert!(matches!(
            store.validate_public(),
            Err(VaultError::KeyNotFound(_))
        ));

        fs::write(store.public_path(), b"not a pem").unwrap();
        assert!(matches!(
            store.validate_public(),
            Err(VaultError::InvalidKey(_))
        ));
    }

    #[test]
    fn locate_active_tolerates_missing_private_key() {
        let dir = TempDir::new().unwrap();
        let store = store_in(dir.path());
        let (private, public) = store.locate_active();
        assert!(!private.exists());
        assert!(!public.exists());
    }

    #[test]
    fn backup_and_restore_round_trip() {
        let dir = TempDir::new().unwrap();
        let backups = TempDir::new().unwrap();
        let store = store_in(dir.path());

        let original = store.generate(OverwritePolicy::Refuse).unwrap();
        let backup_dir = store.backup_to(backups.path()).unwrap();

        store.generate(OverwritePolicy::Force).unwrap();
        assert_ne!(store.fingerprint().unwrap(), original);

        store.restore_from(&backup_dir).unwrap();
        assert_eq!(store.fingerprint().unwrap(), original);
    }

    #[test]
    fn backup_requires_an_existing_pair() {
        let dir = TempDir::new().unwrap();
        let backups = TempDir::new().unwrap();
        let store = store_in(dir.path());
        assert!(matches!(
            store.backup_to(backups.path()),
            Err(VaultError::Backup(_))
        ));
    }

    #[test]
    fn from_config_prefers_explicit_paths() {
        let config = EncryptionConfig {
            private_key: Some(PathBuf::from("/etc/logseal/custom.pem")),
            ..Default::default()
        };
        let store = KeyStore::from_config(&config, Path::new("/var/lib/logseal/keys"));
        assert_eq!(store.private_path(), Path::new("/etc/logseal/custom.pem"));
        assert_eq!(
            store.public_path(),
            Path::new("/var/lib/logseal/keys").join(PUBLIC_KEY_FILE)
        );
    }
}
