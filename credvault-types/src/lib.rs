//! Persisted shapes shared across the Credvault core.
//!
//! Everything the crypto and client layers read from or write to the
//! backend lives here: profiles, memberships, encrypted records, groups,
//! and share records. These types carry ciphertext only — plaintext never
//! appears in any serialized shape.
//!
//! # Byte encoding
//!
//! In memory, IVs, salts, and ciphertexts are raw `Vec<u8>`. On the wire
//! they are standard base64 strings, converted exclusively by the serde
//! helpers in [`encoding`]. No other layer encodes or decodes.

pub mod encoding;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

id_type!(
    /// A user account id.
    UserId
);
id_type!(
    /// An organization id.
    OrgId
);
id_type!(
    /// A group id within an organization.
    GroupId
);
id_type!(
    /// A credential record id.
    RecordId
);
id_type!(
    /// An ephemeral share id.
    ShareId
);

/// A DEK encrypted under a password-derived KEK. Salt and IV are fresh
/// per envelope and never reused.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedKeyEnvelope {
    #[serde(with = "encoding::base64")]
    pub ciphertext: Vec<u8>,
    #[serde(with = "encoding::base64")]
    pub iv: Vec<u8>,
    #[serde(with = "encoding::base64")]
    pub salt: Vec<u8>,
}

/// An identity private key encrypted under the owner's master secret
/// (authenticated mode).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedPrivateKey {
    #[serde(with = "encoding::base64")]
    pub ciphertext: Vec<u8>,
    #[serde(with = "encoding::base64")]
    pub iv: Vec<u8>,
}

/// A user profile as stored server-side. The public key is in the
/// clear; the private key and master secret exist only in wrapped form.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: UserId,
    pub personal_wrapped_key: WrappedKeyEnvelope,
    #[serde(with = "encoding::base64")]
    pub public_key: Vec<u8>,
    pub wrapped_private_key: WrappedPrivateKey,
}

/// Role within an organization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrgRole {
    Admin,
    Manager,
    User,
}

/// One member's asymmetrically wrapped copy of the organization key,
/// plus role and acceptance state. Every accepted member has exactly
/// one live wrapped copy.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrgMembership {
    pub org_id: OrgId,
    pub user_id: UserId,
    #[serde(with = "encoding::base64")]
    pub encrypted_org_key: Vec<u8>,
    pub role: OrgRole,
    pub has_accepted: bool,
}

/// A credential record with all content fields encrypted under the
/// owning DEK (personal or organization, never both) and a single
/// record-unique IV.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EncryptedRecord {
    pub id: RecordId,
    #[serde(with = "encoding::base64")]
    pub iv: Vec<u8>,
    #[serde(with = "encoding::base64_opt")]
    pub name: Option<Vec<u8>>,
    #[serde(with = "encoding::base64_opt")]
    pub username: Option<Vec<u8>>,
    #[serde(with = "encoding::base64_opt")]
    pub password: Option<Vec<u8>>,
    #[serde(with = "encoding::base64_opt")]
    pub url: Option<Vec<u8>>,
    #[serde(with = "encoding::base64_opt")]
    pub note: Option<Vec<u8>>,
    pub organization: Option<OrgId>,
    pub group_id: Option<GroupId>,
}

/// Plaintext counterpart of [`EncryptedRecord`]'s content fields.
/// Exists only in memory, never serialized to the backend.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordFields {
    pub name: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub url: Option<String>,
    pub note: Option<String>,
}

/// A named group inside an organization.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub org_id: OrgId,
    pub name: String,
}

/// Role within a group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupRole {
    GroupAdmin,
    Member,
}

/// A user's membership in a group.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GroupMembership {
    pub group_id: GroupId,
    pub user_id: UserId,
    pub role: GroupRole,
}

/// What kind of content a share carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareKind {
    Credential,
    Text,
}

/// A time-boxed share as persisted server-side. `encrypted_aes_key` is
/// the one-time DEK wrapped under the sender's master secret; the raw
/// DEK only ever travels in the link fragment.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShareRecord {
    pub id: ShareId,
    pub encrypted_aes_key: WrappedKeyEnvelope,
    #[serde(with = "encoding::base64")]
    pub iv: Vec<u8>,
    #[serde(with = "encoding::base64_opt")]
    pub name: Option<Vec<u8>>,
    #[serde(with = "encoding::base64_opt")]
    pub username: Option<Vec<u8>>,
    #[serde(with = "encoding::base64_opt")]
    pub password: Option<Vec<u8>>,
    #[serde(with = "encoding::base64_opt")]
    pub url: Option<Vec<u8>>,
    #[serde(with = "encoding::base64_opt")]
    pub note: Option<Vec<u8>>,
    pub kind: ShareKind,
    pub created_at: DateTime<Utc>,
}

/// Which slice of records a fetch targets. Scoping is an access-control
/// convenience, not a cryptographic boundary: org and group records
/// decrypt under the same organization key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordScope {
    Personal(UserId),
    Org(OrgId),
    Group(GroupId),
}
