//! Encryption configuration surface.
//!
//! Parsed and persisted by the host application's configuration store;
//! this crate only defines the shape it consumes.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Recognized `encryption.*` options.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EncryptionConfig {
    /// Whether recordings are encrypted after capture.
    pub enabled: bool,

    /// Encryption method. Only `asymmetric` is meaningful today.
    pub method: EncryptionMethod,

    /// Public key path; falls back to the default key directory.
    pub public_key: Option<PathBuf>,

    /// Private key path; falls back to the default key directory.
    pub private_key: Option<PathBuf>,

    /// Wrap the session key under [`Self::additional_keys`] too.
    pub multi_recipient: bool,

    /// Additional recipient public keys, consulted only when
    /// `multi_recipient` is set.
    pub additional_keys: Vec<PathBuf>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncryptionMethod {
    #[default]
    Asymmetric,
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            method: EncryptionMethod::Asymmetric,
            public_key: None,
            private_key: None,
            multi_recipient: false,
            additional_keys: Vec::new(),
        }
    }
}

impl EncryptionConfig {
    /// Recipient public keys beyond the primary, honoring the
    /// `multi_recipient` switch.
    pub fn extra_recipients(&self) -> &[PathBuf] {
        if self.multi_recipient {
            &self.additional_keys
        } else {
            &[]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_disabled_asymmetric() {
        let config = EncryptionConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.method, EncryptionMethod::Asymmetric);
        assert!(config.extra_recipients().is_empty());
    }

    #[test]
    fn parses_partial_config() {
        let config: EncryptionConfig = serde_json::from_str(
            r#"{"enabled": true, "method": "asymmetric", "public_key": "/etc/logseal/key.pub.pem"}"#,
        )
        .unwrap();
        assert!(config.enabled);
        assert_eq!(
            config.public_key.as_deref(),
            Some(std::path::Path::new("/etc/logseal/key.pub.pem"))
        );
    }

    #[test]
    fn additional_keys_ignored_without_multi_recipient() {
        let config: EncryptionConfig = serde_json::from_str(
            r#"{"additional_keys": ["/tmp/extra.pem"], "multi_recipient": false}"#,
        )
        .unwrap();
        assert!(config.extra_recipients().is_empty());
    }
}
