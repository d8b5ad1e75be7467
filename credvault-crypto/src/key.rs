//! Typed key material.
//!
//! Every DEK in the hierarchy is 256 bits of OS randomness. The distinct
//! types keep a personal master secret, an organization key, and a
//! one-time share key from being swapped at a call site. All of them
//! zeroize on drop and deliberately do not implement `Debug`.

use crate::cipher::KEY_SIZE;
use rand::RngCore;
use rand::rngs::OsRng;
use zeroize::{Zeroize, ZeroizeOnDrop};

macro_rules! key_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
        pub struct $name([u8; KEY_SIZE]);

        impl $name {
            /// Generates a fresh random key.
            pub fn generate() -> Self {
                let mut bytes = [0u8; KEY_SIZE];
                OsRng.fill_bytes(&mut bytes);
                Self(bytes)
            }

            pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
                &self.0
            }
        }
    };
}

key_type!(
    /// A user's personal DEK. Created at signup, stable for the account
    /// lifetime, never transmitted anywhere in unwrapped form.
    MasterSecret
);

key_type!(
    /// A per-organization DEK. Never stored in the clear; persisted only
    /// as one asymmetrically wrapped copy per member.
    OrganizationKey
);

key_type!(
    /// A single-use DEK minted for one ephemeral share link.
    OneTimeKey
);
