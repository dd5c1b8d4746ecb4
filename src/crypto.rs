//! AES-256-GCM codec for chunk text at rest.
//!
//! Storage format:
//! - chunk text = base64(ciphertext), with the 16-byte GCM tag appended as usual
//! - metadata carries `enc = "aesgcm"`, `enc_iv = base64(IV)`, `enc_v = "1"`
//!
//! A fresh random 96-bit IV is generated per encryption; the key is opaque
//! external material held immutably for the process lifetime. No rotation,
//! no derivation.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::config::EncryptionConfig;

/// Environment variable consulted when the config carries no key.
pub const ENC_KEY_ENV: &str = "SITECHAT_ENC_KEY";

const KEY_BYTES: usize = 32;
const IV_BYTES: usize = 12;

#[derive(Debug)]
pub enum CryptoError {
    /// Key material was not exactly 32 bytes.
    InvalidKey(usize),
    /// Tag verification failed or the inputs were malformed.
    AuthenticationFailure,
}

impl std::fmt::Display for CryptoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CryptoError::InvalidKey(len) => {
                write!(f, "AES-256 key must be 32 bytes, got {}", len)
            }
            CryptoError::AuthenticationFailure => write!(f, "decryption failed"),
        }
    }
}

impl std::error::Error for CryptoError {}

/// Result of one encryption: IV and ciphertext, both Base64.
#[derive(Debug, Clone)]
pub struct Encrypted {
    pub iv_base64: String,
    pub cipher_base64: String,
}

/// Symmetric authenticated codec over one fixed AES-256 key.
pub struct Codec {
    cipher: Aes256Gcm,
}

impl Codec {
    /// Construct from exactly 32 bytes of key material.
    pub fn new(key: &[u8]) -> Result<Self, CryptoError> {
        if key.len() != KEY_BYTES {
            return Err(CryptoError::InvalidKey(key.len()));
        }
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
        Ok(Self { cipher })
    }

    /// Encrypt plaintext under a fresh random IV.
    ///
    /// Two calls on the same plaintext yield different ciphertexts; both
    /// decrypt back to the original.
    pub fn encrypt(&self, plaintext: &str) -> Result<Encrypted, CryptoError> {
        let iv = Aes256Gcm::generate_nonce(&mut OsRng);
        let ct = self
            .cipher
            .encrypt(&iv, plaintext.as_bytes())
            .map_err(|_| CryptoError::AuthenticationFailure)?;
        Ok(Encrypted {
            iv_base64: BASE64.encode(iv),
            cipher_base64: BASE64.encode(ct),
        })
    }

    /// Decrypt a Base64 IV + ciphertext pair back to plaintext.
    pub fn decrypt(&self, iv_base64: &str, cipher_base64: &str) -> Result<String, CryptoError> {
        let iv = BASE64
            .decode(iv_base64)
            .map_err(|_| CryptoError::AuthenticationFailure)?;
        if iv.len() != IV_BYTES {
            return Err(CryptoError::AuthenticationFailure);
        }
        let ct = BASE64
            .decode(cipher_base64)
            .map_err(|_| CryptoError::AuthenticationFailure)?;
        let pt = self
            .cipher
            .decrypt(Nonce::from_slice(&iv), ct.as_slice())
            .map_err(|_| CryptoError::AuthenticationFailure)?;
        String::from_utf8(pt).map_err(|_| CryptoError::AuthenticationFailure)
    }
}

/// Resolve key material through the ordered chain: config value →
/// `SITECHAT_ENC_KEY` environment variable → error.
///
/// Returns `Ok(None)` when encryption is disabled. When enabled, a missing
/// or malformed key is a fatal startup error.
pub fn codec_from_config(config: &EncryptionConfig) -> anyhow::Result<Option<Codec>> {
    if !config.enabled {
        return Ok(None);
    }

    let key_base64 = match &config.key_base64 {
        Some(k) if !k.trim().is_empty() => k.clone(),
        _ => std::env::var(ENC_KEY_ENV).map_err(|_| {
            anyhow::anyhow!(
                "encryption is enabled but no key found in config (encryption.key_base64) or {}",
                ENC_KEY_ENV
            )
        })?,
    };

    let key = BASE64
        .decode(key_base64.trim())
        .map_err(|e| anyhow::anyhow!("encryption key is not valid Base64: {}", e))?;
    let codec = Codec::new(&key)?;
    Ok(Some(codec))
}
