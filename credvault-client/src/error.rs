//! Client orchestration error types.

use thiserror::Error;

/// Result type for client operations.
pub type VaultResult<T> = Result<T, VaultError>;

/// Errors surfaced by session, org, share, and cache orchestration.
#[derive(Debug, Error)]
pub enum VaultError {
    /// No master secret in the session — the caller must re-authenticate.
    /// Fatal to the current view.
    #[error("no key material in session, re-authentication required")]
    KeyUnavailable,

    #[error("invalid password")]
    InvalidPassword,

    #[error("share not found")]
    ShareNotFound,

    #[error("share expired")]
    ShareExpired,

    #[error("malformed share link: {0}")]
    MalformedShareLink(String),

    #[error("membership error: {0}")]
    Membership(String),

    /// Removing the last group admin would orphan the group.
    #[error("cannot remove the last group admin")]
    LastGroupAdmin,

    #[error("backend error: {0}")]
    Backend(String),

    #[error("crypto error: {0}")]
    Crypto(#[from] credvault_crypto::CryptoError),
}
