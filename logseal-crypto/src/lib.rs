//! Hybrid encryption primitives for logseal.
//!
//! Protects session recordings with envelope encryption:
//!
//! 1. **Session key**: a random 256-bit key generated per recording,
//!    used with AES-256-CBC under the OpenSSL `Salted__` framing.
//! 2. **Key wrapping**: the session key is wrapped under one or more
//!    2048-bit RSA public keys with OAEP(SHA-256) and stored next to
//!    the ciphertext.
//!
//! This crate deals in byte buffers and in-memory keys only; path
//! validation, file permissions, and key-file lifecycle live in
//! `logseal-vault`.

mod cipher;
mod error;
mod fingerprint;
mod keys;

pub use cipher::{
    decrypt, encrypt, is_salted_frame, SessionKey, KEY_SIZE, SALTED_MAGIC, SALT_SIZE,
};
pub use error::{CryptoError, CryptoResult};
pub use fingerprint::KeyFingerprint;
pub use keys::{
    generate_keypair, private_key_from_pem, private_key_to_pem, public_key_from_pem,
    public_key_to_pem, unwrap_session_key, wrap_session_key, RsaKeyPair, RSA_BITS,
};

// Re-exported so the vault layer can name key types without a direct rsa dep.
pub use rsa::{RsaPrivateKey, RsaPublicKey};
