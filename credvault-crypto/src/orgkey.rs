//! Organization key distribution primitives.
//!
//! One symmetric key per organization, never stored in the clear.
//! Distribution is one RSA-OAEP ciphertext per member: sealing encrypts
//! the key under a member's public key, revealing opens it with that
//! member's private key. Orchestration (who gets sealed copies, and when
//! the key rotates) lives in the client crate.

use crate::error::{CryptoError, CryptoResult};
use crate::identity::{IdentityKeyPair, import_public};
use crate::key::OrganizationKey;
use rand::rngs::OsRng;
use rsa::Oaep;
use sha2::Sha256;
use zeroize::Zeroize;

/// Seals an organization key for one member under their exported public
/// key bytes. A malformed or absent public key fails closed — callers
/// must not create a membership row on error.
pub fn seal_for_member(org_key: &OrganizationKey, member_public_der: &[u8]) -> CryptoResult<Vec<u8>> {
    let public = import_public(member_public_der)?;
    public
        .encrypt(&mut OsRng, Oaep::new::<Sha256>(), org_key.as_bytes())
        .map_err(|e| CryptoError::Encryption(format!("org key seal failed: {e}")))
}

/// Opens a sealed organization key with the member's own private key.
/// Fails for any other member's key.
pub fn open_for_member(
    sealed: &[u8],
    member: &IdentityKeyPair,
) -> CryptoResult<OrganizationKey> {
    let mut plaintext = member
        .private()
        .decrypt(Oaep::new::<Sha256>(), sealed)
        .map_err(|_| {
            CryptoError::Decryption("org key open failed (wrong member key?)".to_string())
        })?;

    if plaintext.len() != crate::cipher::KEY_SIZE {
        let actual = plaintext.len();
        plaintext.zeroize();
        return Err(CryptoError::InvalidKeyLength {
            expected: crate::cipher::KEY_SIZE,
            actual,
        });
    }

    let mut bytes = [0u8; crate::cipher::KEY_SIZE];
    bytes.copy_from_slice(&plaintext);
    plaintext.zeroize();
    Ok(OrganizationKey::from_bytes(bytes))
}
