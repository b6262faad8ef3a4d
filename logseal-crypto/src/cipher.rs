//! Symmetric content cipher for session recordings.
//!
//! Bulk data is encrypted with AES-256-CBC under a random per-session
//! [`SessionKey`]. The output uses the OpenSSL `Salted__` framing: an
//! 8-byte magic, an 8-byte random salt, then the PKCS#7-padded ciphertext.
//! AES key and IV are derived from the session key and salt with
//! PBKDF2-HMAC-SHA256, so recordings written here stay recoverable with
//! stock OpenSSL tooling given the raw session key.

use crate::error::{CryptoError, CryptoResult};
use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::Hmac;
use rand::RngCore;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Session key size in bytes (AES-256).
pub const KEY_SIZE: usize = 32;

/// Salt size in bytes within the `Salted__` frame.
pub const SALT_SIZE: usize = 8;

/// Magic prefix of a salted cipher frame.
pub const SALTED_MAGIC: &[u8; 8] = b"Salted__";

/// PBKDF2 rounds for key+IV derivation. Matches `openssl enc -pbkdf2`.
const PBKDF2_ROUNDS: u32 = 10_000;

/// Random 256-bit key protecting one recording's content.
///
/// Generated fresh per encryption, wrapped under the recipient public key,
/// and zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionKey([u8; KEY_SIZE]);

impl SessionKey {
    /// Generates a fresh random session key from the OS RNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Reconstructs a session key from an unwrapped byte buffer.
    pub fn try_from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(CryptoError::InvalidKeyLength {
                expected: KEY_SIZE,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; KEY_SIZE];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

/// Derives the AES-256 key and CBC IV for one frame.
fn derive_key_iv(key: &SessionKey, salt: &[u8]) -> CryptoResult<([u8; 32], [u8; 16])> {
    let mut okm = Zeroizing::new([0u8; 48]);
    pbkdf2::pbkdf2::<Hmac<Sha256>>(key.as_bytes(), salt, PBKDF2_ROUNDS, okm.as_mut())
        .map_err(|e| CryptoError::Encryption(format!("key derivation failed: {e}")))?;

    let mut aes_key = [0u8; 32];
    let mut iv = [0u8; 16];
    aes_key.copy_from_slice(&okm[..32]);
    iv.copy_from_slice(&okm[32..]);
    Ok((aes_key, iv))
}

/// Returns whether `data` carries the `Salted__` frame prefix.
///
/// One of the two accepted "is this encrypted" detection strategies; the
/// other is the `.enc` file-name convention enforced by the vault layer.
/// Both agree for artifacts this crate produces.
pub fn is_salted_frame(data: &[u8]) -> bool {
    data.len() >= SALTED_MAGIC.len() + SALT_SIZE && data.starts_with(SALTED_MAGIC)
}

/// Encrypts `plaintext` under `key` with a fresh random salt.
pub fn encrypt(key: &SessionKey, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
    let mut salt = [0u8; SALT_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut salt);

    let (aes_key, iv) = derive_key_iv(key, &salt)?;
    let ciphertext =
        Aes256CbcEnc::new(&aes_key.into(), &iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    let mut out = Vec::with_capacity(SALTED_MAGIC.len() + SALT_SIZE + ciphertext.len());
    out.extend_from_slice(SALTED_MAGIC);
    out.extend_from_slice(&salt);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypts a salted cipher frame produced by [`encrypt`].
pub fn decrypt(key: &SessionKey, framed: &[u8]) -> CryptoResult<Vec<u8>> {
    if !is_salted_frame(framed) {
        return Err(CryptoError::InvalidFrame);
    }

    let salt = &framed[SALTED_MAGIC.len()..SALTED_MAGIC.len() + SALT_SIZE];
    let ciphertext = &framed[SALTED_MAGIC.len() + SALT_SIZE..];
    if ciphertext.is_empty() || ciphertext.len() % 16 != 0 {
        return Err(CryptoError::Decryption(
            "ciphertext is not a whole number of cipher blocks".to_string(),
        ));
    }

    let (aes_key, iv) = derive_key_iv(key, salt)?;
    Aes256CbcDec::new(&aes_key.into(), &iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| {
            CryptoError::Decryption("padding check failed (corrupted data or wrong key)".to_string())
        })
}
