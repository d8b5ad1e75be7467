//! Organization key distribution tests.

use credvault_crypto::{
    CryptoError, IdentityKeyPair, OrganizationKey, open_for_member, seal_for_member,
};

#[test]
fn sealed_key_opens_for_the_intended_member() {
    let member = IdentityKeyPair::generate().unwrap();
    let org_key = OrganizationKey::generate();

    let sealed = seal_for_member(&org_key, &member.export_public().unwrap()).unwrap();
    let revealed = open_for_member(&sealed, &member).unwrap();

    assert_eq!(revealed.as_bytes(), org_key.as_bytes());
}

#[test]
fn sealed_key_does_not_open_for_another_member() {
    let alice = IdentityKeyPair::generate().unwrap();
    let mallory = IdentityKeyPair::generate().unwrap();
    let org_key = OrganizationKey::generate();

    let sealed = seal_for_member(&org_key, &alice.export_public().unwrap()).unwrap();
    let result = open_for_member(&sealed, &mallory);

    assert!(matches!(result, Err(CryptoError::Decryption(_))));
}

#[test]
fn each_seal_produces_different_ciphertext() {
    let member = IdentityKeyPair::generate().unwrap();
    let org_key = OrganizationKey::generate();
    let public = member.export_public().unwrap();

    // OAEP is randomized, so two wraps of the same key never collide
    let a = seal_for_member(&org_key, &public).unwrap();
    let b = seal_for_member(&org_key, &public).unwrap();
    assert_ne!(a, b);

    assert_eq!(open_for_member(&a, &member).unwrap().as_bytes(), org_key.as_bytes());
    assert_eq!(open_for_member(&b, &member).unwrap().as_bytes(), org_key.as_bytes());
}

#[test]
fn malformed_public_key_fails_closed() {
    let org_key = OrganizationKey::generate();

    let result = seal_for_member(&org_key, b"garbage");
    assert!(matches!(result, Err(CryptoError::InvalidKey(_))));

    let result = seal_for_member(&org_key, &[]);
    assert!(matches!(result, Err(CryptoError::InvalidKey(_))));
}

#[test]
fn tampered_sealed_key_fails_to_open() {
    let member = IdentityKeyPair::generate().unwrap();
    let org_key = OrganizationKey::generate();

    let mut sealed = seal_for_member(&org_key, &member.export_public().unwrap()).unwrap();
    sealed[0] ^= 0xFF;

    assert!(matches!(
        open_for_member(&sealed, &member),
        Err(CryptoError::Decryption(_))
    ));
}
