//! Shared test helpers: scratch log roots and generated key pairs.

use logseal_vault::{
    HybridCipher, KeyStore, MemorySink, MetadataSink, OverwritePolicy, PathGuard,
    PRIVATE_KEY_FILE, PUBLIC_KEY_FILE,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// A scratch log root plus a freshly generated key pair.
pub struct Fixture {
    pub logs: TempDir,
    pub keys: TempDir,
    pub store: KeyStore,
    pub sink: Arc<MemorySink>,
}

impl Fixture {
    pub fn new() -> Self {
        let logs = TempDir::new().unwrap();
        let keys = TempDir::new().unwrap();
        let store = KeyStore::new(
            keys.path().join(PRIVATE_KEY_FILE),
            keys.path().join(PUBLIC_KEY_FILE),
        );
        store.generate(OverwritePolicy::Refuse).unwrap();
        Self {
            logs,
            keys,
            store,
            sink: Arc::new(MemorySink::new()),
        }
    }

    pub fn guard(&self) -> PathGuard {
        PathGuard::new(self.logs.path()).unwrap()
    }

    pub fn cipher(&self) -> HybridCipher {
        HybridCipher::new(self.guard()).with_sink(self.sink.clone() as Arc<dyn MetadataSink>)
    }

    /// Writes a plaintext recording and returns its path.
    pub fn write_recording(&self, session: &str, bytes: &[u8]) -> PathBuf {
        let path = self.logs.path().join(format!("{session}.log"));
        std::fs::write(&path, bytes).unwrap();
        path
    }

    /// Ciphertext path for a session's transcript.
    pub fn ciphertext_path(&self, session: &str) -> PathBuf {
        self.logs.path().join(format!("{session}.log.enc"))
    }

    /// A distinct second key pair in its own directory.
    pub fn other_keystore(&self) -> (TempDir, KeyStore) {
        let dir = TempDir::new().unwrap();
        let store = KeyStore::new(
            dir.path().join(PRIVATE_KEY_FILE),
            dir.path().join(PUBLIC_KEY_FILE),
        );
        store.generate(OverwritePolicy::Refuse).unwrap();
        (dir, store)
    }
}

/// Unix permission bits of a path, masked to the classic triplet.
#[cfg(unix)]
pub fn mode_of(path: &Path) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path).unwrap().permissions().mode() & 0o777
}
