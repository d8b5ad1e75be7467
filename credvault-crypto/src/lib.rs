//! Encryption layer for Credvault.
//!
//! Provides the key hierarchy for a zero-knowledge credential vault:
//! - PBKDF2-HMAC-SHA256 for key derivation from passwords
//! - AES-256-CBC for record content fields (explicit IV)
//! - AES-256-GCM for private-key wrapping (authenticated)
//! - RSA-2048 / OAEP-SHA256 for distributing organization keys
//! - Secure key management with zeroization
//!
//! # Architecture
//!
//! A three-tier key system:
//!
//! 1. **Master secret**: 256 random bits per user, wrapped under a
//!    password-derived KEK. The backend only ever sees the wrapped form.
//!
//! 2. **Organization key**: 256 random bits per organization, persisted
//!    once per member as an RSA-OAEP ciphertext under that member's
//!    public key.
//!
//! 3. **One-time key**: 256 random bits per ephemeral share, delivered
//!    out-of-band via a link fragment.
//!
//! # Cipher mode asymmetry
//!
//! Record fields use CBC (non-authenticated) while private keys use GCM.
//! This asymmetry is deliberate and matches the persisted data format:
//! a corrupted record field degrades to a placeholder in a list view,
//! whereas a corrupted private key must fail loudly rather than yield a
//! silently wrong key. Unauthenticated field ciphertext can be corrupted
//! without detection; that is a documented tradeoff, not an oversight.

mod cipher;
mod error;
mod key;
mod keywrap;

pub mod identity;
pub mod orgkey;

pub use cipher::{
    IV_SIZE, KEY_SIZE, NONCE_SIZE, decrypt_aead, decrypt_field, encrypt_aead, encrypt_field,
    random_iv, random_nonce,
};
pub use error::{CryptoError, CryptoResult};
pub use identity::{IdentityKeyPair, import_public};
pub use key::{MasterSecret, OneTimeKey, OrganizationKey};
pub use keywrap::{PBKDF2_ITERATIONS, SALT_SIZE, unwrap_key, wrap_key};
pub use orgkey::{open_for_member, seal_for_member};
