//! RSA key pairs and session-key wrapping.
//!
//! A recording's random [`SessionKey`] is wrapped under one or more RSA
//! public keys with OAEP(SHA-256) and stored alongside the ciphertext.
//! Keys travel as PEM: PKCS#8 for private keys, SPKI for public keys.

use crate::cipher::SessionKey;
use crate::error::{CryptoError, CryptoResult};
use rsa::pkcs8::{
    DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding,
};
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

/// RSA modulus size for generated key pairs.
pub const RSA_BITS: usize = 2048;

/// An RSA key pair held in memory.
pub struct RsaKeyPair {
    pub private: RsaPrivateKey,
    pub public: RsaPublicKey,
}

/// Generates a fresh 2048-bit RSA key pair.
pub fn generate_keypair() -> CryptoResult<RsaKeyPair> {
    let private = RsaPrivateKey::new(&mut rand::rngs::OsRng, RSA_BITS)
        .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
    let public = RsaPublicKey::from(&private);
    Ok(RsaKeyPair { private, public })
}

/// Encodes a private key as PKCS#8 PEM.
pub fn private_key_to_pem(key: &RsaPrivateKey) -> CryptoResult<String> {
    key.to_pkcs8_pem(LineEnding::LF)
        .map(|pem| pem.to_string())
        .map_err(|e| CryptoError::InvalidKey(format!("private key encoding failed: {e}")))
}

/// Parses a PKCS#8 PEM private key.
pub fn private_key_from_pem(pem: &str) -> CryptoResult<RsaPrivateKey> {
    RsaPrivateKey::from_pkcs8_pem(pem)
        .map_err(|e| CryptoError::InvalidKey(format!("private key parse failed: {e}")))
}

/// Encodes a public key as SPKI PEM.
pub fn public_key_to_pem(key: &RsaPublicKey) -> CryptoResult<String> {
    key.to_public_key_pem(LineEnding::LF)
        .map_err(|e| CryptoError::InvalidKey(format!("public key encoding failed: {e}")))
}

/// Parses an SPKI PEM public key.
pub fn public_key_from_pem(pem: &str) -> CryptoResult<RsaPublicKey> {
    RsaPublicKey::from_public_key_pem(pem)
        .map_err(|e| CryptoError::InvalidKey(format!("public key parse failed: {e}")))
}

/// Wraps a session key under every recipient public key.
///
/// The blob is the concatenation of one OAEP block per recipient, each
/// exactly the recipient's modulus size. [`unwrap_session_key`] slices
/// the blob by the modulus of whichever private key it holds, so every
/// recipient must share the first recipient's modulus size; a mismatched
/// key is rejected here rather than producing a blob only some
/// recipients can slice.
pub fn wrap_session_key(
    key: &SessionKey,
    recipients: &[&RsaPublicKey],
) -> CryptoResult<Vec<u8>> {
    let Some(first) = recipients.first() else {
        return Err(CryptoError::Encryption("no recipient public keys".to_string()));
    };
    let block_len = first.size();

    let mut blob = Vec::with_capacity(recipients.len() * block_len);
    for public in recipients {
        if public.size() != block_len {
            return Err(CryptoError::InvalidKey(format!(
                "recipient modulus size {} differs from the primary's {block_len}",
                public.size()
            )));
        }
        let block = public
            .encrypt(&mut rand::rngs::OsRng, Oaep::new::<Sha256>(), key.as_bytes())
            .map_err(|e| CryptoError::Encryption(format!("session key wrap failed: {e}")))?;
        blob.extend_from_slice(&block);
    }
    Ok(blob)
}

/// Recovers a session key from a wrapped-key blob.
///
/// Tries each modulus-sized block in order; the first that unwraps to a
/// well-formed key wins. Every block failing means the private key is not
/// among the recipients (or the blob is corrupted) and is reported as
/// [`CryptoError::KeyMismatch`].
pub fn unwrap_session_key(blob: &[u8], private: &RsaPrivateKey) -> CryptoResult<SessionKey> {
    let block_len = private.size();
    if blob.is_empty() || blob.len() % block_len != 0 {
        return Err(CryptoError::Decryption(format!(
            "wrapped key blob length {} is not a multiple of the modulus size {block_len}",
            blob.len()
        )));
    }

    for block in blob.chunks_exact(block_len) {
        if let Ok(key_bytes) = private.decrypt(Oaep::new::<Sha256>(), block) {
            return SessionKey::try_from_slice(&key_bytes);
        }
    }
    Err(CryptoError::KeyMismatch)
}
