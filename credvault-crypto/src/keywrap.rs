//! Password-based key wrapping.
//!
//! PBKDF2-HMAC-SHA256 over a fresh random salt derives the KEK; the KEK
//! plus a fresh random IV feed AES-256-CBC to wrap the DEK. `wrap_key`
//! mints its own salt and IV — callers cannot supply randomness, which
//! rules out an entire class of reuse bugs.

use crate::cipher::{self, KEY_SIZE};
use crate::error::{CryptoError, CryptoResult};
use credvault_types::WrappedKeyEnvelope;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::Sha256;
use zeroize::Zeroize;

/// KDF salt size in bytes.
pub const SALT_SIZE: usize = 16;
/// PBKDF2 iteration count.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

fn derive_kek(password: &str, salt: &[u8]) -> CryptoResult<[u8; KEY_SIZE]> {
    if salt.len() != SALT_SIZE {
        return Err(CryptoError::KeyDerivation(format!(
            "invalid salt length: expected {SALT_SIZE}, got {}",
            salt.len()
        )));
    }
    let mut kek = [0u8; KEY_SIZE];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ITERATIONS, &mut kek);
    Ok(kek)
}

/// Wraps a DEK under a password. Salt and IV are fresh per envelope and
/// never reused across envelopes.
pub fn wrap_key(dek: &[u8; KEY_SIZE], password: &str) -> CryptoResult<WrappedKeyEnvelope> {
    let mut salt = [0u8; SALT_SIZE];
    OsRng.fill_bytes(&mut salt);

    let mut kek = derive_kek(password, &salt)?;
    let iv = cipher::random_iv();
    let result = cipher::encrypt_field(dek, &kek, &iv);
    kek.zeroize();

    Ok(WrappedKeyEnvelope {
        ciphertext: result?,
        iv: iv.to_vec(),
        salt: salt.to_vec(),
    })
}

/// Unwraps a DEK. The exact inverse of [`wrap_key`].
///
/// CBC is not authenticated, so a wrong password usually fails as a
/// padding or length error but can also return 32 bytes of garbage with
/// `Ok`. Callers must verify the result downstream (the authenticated
/// private-key unwrap serves as that check at login).
pub fn unwrap_key(envelope: &WrappedKeyEnvelope, password: &str) -> CryptoResult<[u8; KEY_SIZE]> {
    let mut kek = derive_kek(password, &envelope.salt)?;

    // CBC on raw key bytes, not text: bypass the UTF-8 field path.
    let result = cipher::decrypt_cbc(&envelope.ciphertext, &kek, &envelope.iv);
    kek.zeroize();
    let mut plaintext = result?;

    if plaintext.len() != KEY_SIZE {
        let len = plaintext.len();
        plaintext.zeroize();
        return Err(CryptoError::Decryption(format!(
            "unwrapped key has wrong length {len} (wrong password?)"
        )));
    }

    let mut dek = [0u8; KEY_SIZE];
    dek.copy_from_slice(&plaintext);
    plaintext.zeroize();
    Ok(dek)
}
