//! Metadata sink for encryption bookkeeping.
//!
//! The host application records which public-key fingerprint protected
//! each session. The hybrid cipher reports through this trait after every
//! successful encryption; it never owns the durable store itself.

use chrono::{DateTime, Utc};
use logseal_crypto::KeyFingerprint;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("metadata store error: {0}")]
    Storage(String),
}

pub type SinkResult<T> = Result<T, SinkError>;

/// One session's encryption bookkeeping entry.
///
/// Created once per successful encryption; the fingerprint is replaced
/// on rotation once that session's files are re-encrypted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EncryptionRecord {
    pub session_id: String,
    pub fingerprint: KeyFingerprint,
    pub encrypted_at: DateTime<Utc>,
}

/// Key-value record store consumed after every successful encrypt.
pub trait MetadataSink: Send + Sync {
    fn record(&self, record: EncryptionRecord) -> SinkResult<()>;

    fn lookup(&self, session_id: &str) -> SinkResult<Option<EncryptionRecord>>;
}

/// In-memory sink for tests and embedders that keep bookkeeping elsewhere.
#[derive(Default)]
pub struct MemorySink {
    records: RwLock<HashMap<String, EncryptionRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded sessions.
    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MetadataSink for MemorySink {
    fn record(&self, record: EncryptionRecord) -> SinkResult<()> {
        let mut records = self
            .records
            .write()
            .map_err(|e| SinkError::Storage(e.to_string()))?;
        records.insert(record.session_id.clone(), record);
        Ok(())
    }

    fn lookup(&self, session_id: &str) -> SinkResult<Option<EncryptionRecord>> {
        let records = self
            .records
            .read()
            .map_err(|e| SinkError::Storage(e.to_string()))?;
        Ok(records.get(session_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logseal_crypto::{generate_keypair, KeyFingerprint};

    #[test]
    fn record_then_lookup() {
        let sink = MemorySink::new();
        let fingerprint =
            KeyFingerprint::of_public_key(&generate_keypair().unwrap().public).unwrap();

        sink.record(EncryptionRecord {
            session_id: "session-1".into(),
            fingerprint: fingerprint.clone(),
            encrypted_at: Utc::now(),
        })
        .unwrap();

        let found = sink.lookup("session-1").unwrap().unwrap();
        assert_eq!(found.fingerprint, fingerprint);
        assert!(sink.lookup("session-2").unwrap().is_none());
    }

    #[test]
    fn rotation_replaces_fingerprint() {
        let sink = MemorySink::new();
        let old = KeyFingerprint::of_public_key(&generate_keypair().unwrap().public).unwrap();
        let new = KeyFingerprint::of_public_key(&generate_keypair().unwrap().public).unwrap();

        for fp in [&old, &new] {
            sink.record(EncryptionRecord {
                session_id: "session-1".into(),
                fingerprint: fp.clone(),
                encrypted_at: Utc::now(),
            })
            .unwrap();
        }

        assert_eq!(sink.lookup("session-1").unwrap().unwrap().fingerprint, new);
        assert_eq!(sink.len(), 1);
    }
}
