//! Symmetric field cipher.
//!
//! Two deliberately different modes:
//!
//! - AES-256-CBC with PKCS#7 padding and an explicit IV for record content
//!   fields. Non-authenticated: silent corruption of a field is possible
//!   and is surfaced downstream as a per-field placeholder, not a crash.
//! - AES-256-GCM for private-key wrapping, where tampering must be
//!   detected rather than produce a silently wrong key.
//!
//! Both are pure functions over the provided byte buffers.

use crate::error::{CryptoError, CryptoResult};
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::RngCore;
use rand::rngs::OsRng;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Symmetric key size in bytes (AES-256).
pub const KEY_SIZE: usize = 32;
/// CBC initialization vector size in bytes.
pub const IV_SIZE: usize = 16;
/// GCM nonce size in bytes.
pub const NONCE_SIZE: usize = 12;

fn check_key(dek: &[u8]) -> CryptoResult<&GenericArray<u8, aes::cipher::consts::U32>> {
    if dek.len() != KEY_SIZE {
        return Err(CryptoError::InvalidKeyLength {
            expected: KEY_SIZE,
            actual: dek.len(),
        });
    }
    Ok(GenericArray::from_slice(dek))
}

fn check_iv(iv: &[u8]) -> CryptoResult<&GenericArray<u8, aes::cipher::consts::U16>> {
    if iv.len() != IV_SIZE {
        return Err(CryptoError::Decryption(format!(
            "invalid IV length: expected {IV_SIZE}, got {}",
            iv.len()
        )));
    }
    Ok(GenericArray::from_slice(iv))
}

/// Generates a fresh random CBC IV.
pub fn random_iv() -> [u8; IV_SIZE] {
    let mut iv = [0u8; IV_SIZE];
    OsRng.fill_bytes(&mut iv);
    iv
}

/// Generates a fresh random GCM nonce.
pub fn random_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Encrypts one text field under a DEK with an explicit IV (AES-256-CBC).
///
/// Deterministic given identical inputs. The IV must be unique per record;
/// uniqueness is the caller's contract, enforced by only ever minting IVs
/// via [`random_iv`].
pub fn encrypt_field(plaintext: &[u8], dek: &[u8], iv: &[u8]) -> CryptoResult<Vec<u8>> {
    let key = check_key(dek)?;
    let iv = check_iv(iv)?;
    Ok(Aes256CbcEnc::new(key, iv).encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}

/// Decrypts one text field.
///
/// A wrong key or IV usually manifests as a padding failure, but CBC can
/// also yield garbage with valid padding; the UTF-8 check catches most of
/// that. Either way the caller gets a typed failure, never a panic.
pub fn decrypt_field(ciphertext: &[u8], dek: &[u8], iv: &[u8]) -> CryptoResult<String> {
    let plaintext = decrypt_cbc(ciphertext, dek, iv)?;
    String::from_utf8(plaintext)
        .map_err(|_| CryptoError::Decryption("plaintext is not valid UTF-8".to_string()))
}

/// CBC core shared by the field path and the key-wrap path. Key material
/// is raw bytes, not text, so no UTF-8 check here.
pub(crate) fn decrypt_cbc(ciphertext: &[u8], dek: &[u8], iv: &[u8]) -> CryptoResult<Vec<u8>> {
    let key = check_key(dek)?;
    let iv = check_iv(iv)?;

    if ciphertext.is_empty() || ciphertext.len() % 16 != 0 {
        return Err(CryptoError::Decryption(format!(
            "malformed ciphertext length {}",
            ciphertext.len()
        )));
    }

    Aes256CbcDec::new(key, iv)
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CryptoError::Decryption("bad padding (wrong key or IV?)".to_string()))
}

/// Encrypts bytes under a DEK with AES-256-GCM, returning ciphertext and
/// the fresh nonce. Used for private-key wrapping where tamper detection
/// is required.
pub fn encrypt_aead(plaintext: &[u8], dek: &[u8]) -> CryptoResult<(Vec<u8>, [u8; NONCE_SIZE])> {
    check_key(dek)?;
    let cipher = Aes256Gcm::new_from_slice(dek)
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;

    let nonce = random_nonce();
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| CryptoError::Encryption(format!("AEAD encryption failed: {e}")))?;

    Ok((ciphertext, nonce))
}

/// Decrypts AEAD ciphertext. Any bit flip in nonce, ciphertext, or tag
/// fails authentication — this never returns silently wrong plaintext.
pub fn decrypt_aead(ciphertext: &[u8], dek: &[u8], nonce: &[u8]) -> CryptoResult<Vec<u8>> {
    check_key(dek)?;
    if nonce.len() != NONCE_SIZE {
        return Err(CryptoError::Decryption(format!(
            "invalid nonce length: expected {NONCE_SIZE}, got {}",
            nonce.len()
        )));
    }

    let cipher = Aes256Gcm::new_from_slice(dek)
        .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;

    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| {
            CryptoError::Decryption("AEAD open failed (wrong key or tampered data)".to_string())
        })
}
