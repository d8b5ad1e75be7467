//! Client-side orchestration for Credvault.
//!
//! Everything above the crypto primitives: the authenticated session,
//! organization key distribution, group access filtering, ephemeral
//! share links, and the decrypted-view cache. The backend is an external
//! collaborator reached only through the [`VaultBackend`] trait — this
//! crate never routes, renders, or authorizes.

pub mod backend;
pub mod cache;
pub mod error;
pub mod groups;
pub mod orgs;
pub mod records;
pub mod session;
pub mod share;

pub use backend::VaultBackend;
pub use cache::{DecryptedEntry, DecryptedView, DecryptedViewCache, Provenance, DEFAULT_TTL};
pub use error::{VaultError, VaultResult};
pub use orgs::OrgDirector;
pub use records::{DECRYPT_PLACEHOLDER, decrypt_record, encrypt_record, reencrypt_record};
pub use session::Session;
pub use share::{SHARE_RETENTION_HOURS, ShareLink, ShareManager};
