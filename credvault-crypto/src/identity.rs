//! Identity keypair management.
//!
//! One RSA-2048 keypair per user, generated at signup. The public half is
//! published in the clear; the private half is wrapped under the owner's
//! master secret with AES-256-GCM and only ever leaves the device in that
//! form. OAEP-SHA256 padding supports encrypting a 256-bit DEK in a
//! single asymmetric operation.

use crate::cipher;
use crate::error::{CryptoError, CryptoResult};
use crate::key::MasterSecret;
use credvault_types::WrappedPrivateKey;
use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};

/// RSA modulus size in bits.
pub const RSA_BITS: usize = 2048;

/// A user's asymmetric identity keypair.
#[derive(Clone)]
pub struct IdentityKeyPair {
    private: RsaPrivateKey,
    public: RsaPublicKey,
}

impl IdentityKeyPair {
    /// Generates a fresh RSA-2048 keypair. Runs once at signup; this is
    /// by far the slowest primitive in the crate.
    pub fn generate() -> CryptoResult<Self> {
        let private = RsaPrivateKey::new(&mut OsRng, RSA_BITS)
            .map_err(|e| CryptoError::KeyDerivation(format!("RSA keygen failed: {e}")))?;
        let public = RsaPublicKey::from(&private);
        Ok(Self { private, public })
    }

    /// Exports the public key as PKCS#8 DER bytes (portable, not secret).
    pub fn export_public(&self) -> CryptoResult<Vec<u8>> {
        self.public
            .to_public_key_der()
            .map(|der| der.as_bytes().to_vec())
            .map_err(|e| CryptoError::InvalidKey(format!("public key export failed: {e}")))
    }

    /// Exports the private key as PKCS#8 DER bytes. Callers must wrap the
    /// result before it goes anywhere near persistence.
    pub fn export_private(&self) -> CryptoResult<Vec<u8>> {
        self.private
            .to_pkcs8_der()
            .map(|der| der.as_bytes().to_vec())
            .map_err(|e| CryptoError::InvalidKey(format!("private key export failed: {e}")))
    }

    /// Reconstructs a keypair from PKCS#8 DER private key bytes.
    pub fn import_private(der: &[u8]) -> CryptoResult<Self> {
        let private = RsaPrivateKey::from_pkcs8_der(der)
            .map_err(|e| CryptoError::InvalidKey(format!("malformed private key: {e}")))?;
        let public = RsaPublicKey::from(&private);
        Ok(Self { private, public })
    }

    /// Wraps the private key under the owner's master secret
    /// (authenticated mode — tampering is detected on unwrap).
    pub fn wrap_private(&self, dek: &MasterSecret) -> CryptoResult<WrappedPrivateKey> {
        let der = self.export_private()?;
        let (ciphertext, nonce) = cipher::encrypt_aead(&der, dek.as_bytes())?;
        Ok(WrappedPrivateKey {
            ciphertext,
            iv: nonce.to_vec(),
        })
    }

    /// Unwraps a private key. Any bit flip in IV or ciphertext fails;
    /// this never silently returns a wrong key.
    pub fn unwrap_private(
        wrapped: &WrappedPrivateKey,
        dek: &MasterSecret,
    ) -> CryptoResult<Self> {
        let der = cipher::decrypt_aead(&wrapped.ciphertext, dek.as_bytes(), &wrapped.iv)?;
        Self::import_private(&der)
    }

    pub(crate) fn private(&self) -> &RsaPrivateKey {
        &self.private
    }

    pub fn public(&self) -> &RsaPublicKey {
        &self.public
    }
}

/// Parses exported public key bytes back into a usable key.
/// Fails closed on malformed input.
pub fn import_public(der: &[u8]) -> CryptoResult<RsaPublicKey> {
    RsaPublicKey::from_public_key_der(der)
        .map_err(|e| CryptoError::InvalidKey(format!("malformed public key: {e}")))
}
