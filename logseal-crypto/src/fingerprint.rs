//! Public key fingerprints.
//!
//! A fingerprint is the SHA-256 digest of the public key's SPKI DER,
//! rendered `SHA256:<base64>` like OpenSSH host key digests. It identifies
//! which key protected a recording; it is never a decryption credential.

use crate::error::{CryptoError, CryptoResult};
use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use rsa::pkcs8::EncodePublicKey;
use rsa::RsaPublicKey;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Deterministic short digest identifying a public key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyFingerprint(String);

impl KeyFingerprint {
    /// Computes the fingerprint of a public key.
    pub fn of_public_key(key: &RsaPublicKey) -> CryptoResult<Self> {
        let der = key
            .to_public_key_der()
            .map_err(|e| CryptoError::InvalidKey(format!("public key encoding failed: {e}")))?;
        let digest = Sha256::digest(der.as_bytes());
        Ok(Self(format!("SHA256:{}", STANDARD_NO_PAD.encode(digest))))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::generate_keypair;

    #[test]
    fn identical_keys_yield_identical_fingerprints() {
        let pair = generate_keypair().unwrap();
        let a = KeyFingerprint::of_public_key(&pair.public).unwrap();
        let b = KeyFingerprint::of_public_key(&pair.public).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_keys_yield_distinct_fingerprints() {
        let a = KeyFingerprint::of_public_key(&generate_keypair().unwrap().public).unwrap();
        let b = KeyFingerprint::of_public_key(&generate_keypair().unwrap().public).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn rendering_uses_openssh_style_prefix() {
        let fp = KeyFingerprint::of_public_key(&generate_keypair().unwrap().public).unwrap();
        assert!(fp.as_str().starts_with("SHA256:"));
    }

    #[test]
    fn serde_round_trip() {
        let fp = KeyFingerprint::of_public_key(&generate_keypair().unwrap().public).unwrap();
        let json = serde_json::to_string(&fp).unwrap();
        let back: KeyFingerprint = serde_json::from_str(&json).unwrap();
        assert_eq!(fp, back);
    }
}
