//! Record field encryption and decryption.
//!
//! One fresh IV per record; every content field is encrypted under that
//! IV and the owning DEK (personal or organization, never both). Field
//! decryption is isolated: one corrupted field renders as a placeholder
//! and never aborts the rest of the record or the surrounding list.

use crate::error::VaultResult;
use credvault_crypto::{KEY_SIZE, decrypt_field, encrypt_field, random_iv};
use credvault_types::{EncryptedRecord, GroupId, OrgId, RecordFields, RecordId};
use tracing::debug;

/// Rendered in place of a field that failed to decrypt.
pub const DECRYPT_PLACEHOLDER: &str = "[unable to decrypt]";

fn encrypt_opt(
    value: &Option<String>,
    dek: &[u8; KEY_SIZE],
    iv: &[u8],
) -> VaultResult<Option<Vec<u8>>> {
    match value {
        Some(text) => Ok(Some(encrypt_field(text.as_bytes(), dek, iv)?)),
        None => Ok(None),
    }
}

fn decrypt_opt(
    record_id: RecordId,
    field: &'static str,
    value: &Option<Vec<u8>>,
    dek: &[u8; KEY_SIZE],
    iv: &[u8],
) -> Option<String> {
    let ciphertext = value.as_ref()?;
    match decrypt_field(ciphertext, dek, iv) {
        Ok(plaintext) => Some(plaintext),
        Err(e) => {
            debug!("field {field} of record {record_id} failed to decrypt: {e}");
            Some(DECRYPT_PLACEHOLDER.to_string())
        }
    }
}

/// Encrypts a full set of plaintext fields into a new record with a
/// fresh, record-unique IV.
pub fn encrypt_record(
    fields: &RecordFields,
    dek: &[u8; KEY_SIZE],
    organization: Option<OrgId>,
    group_id: Option<GroupId>,
) -> VaultResult<EncryptedRecord> {
    let iv = random_iv();
    Ok(EncryptedRecord {
        id: RecordId::new(),
        name: encrypt_opt(&fields.name, dek, &iv)?,
        username: encrypt_opt(&fields.username, dek, &iv)?,
        password: encrypt_opt(&fields.password, dek, &iv)?,
        url: encrypt_opt(&fields.url, dek, &iv)?,
        note: encrypt_opt(&fields.note, dek, &iv)?,
        iv: iv.to_vec(),
        organization,
        group_id,
    })
}

/// Re-encrypts a record under a new DEK with a fresh IV, preserving its
/// identity and scope. Used by org key rotation. Strict: any field that
/// fails to decrypt aborts the rotation rather than baking garbage into
/// the re-encrypted record.
pub fn reencrypt_record(
    record: &EncryptedRecord,
    old_dek: &[u8; KEY_SIZE],
    new_dek: &[u8; KEY_SIZE],
) -> VaultResult<EncryptedRecord> {
    let strict = |value: &Option<Vec<u8>>| -> VaultResult<Option<String>> {
        match value {
            Some(ciphertext) => Ok(Some(decrypt_field(ciphertext, old_dek, &record.iv)?)),
            None => Ok(None),
        }
    };

    let fields = RecordFields {
        name: strict(&record.name)?,
        username: strict(&record.username)?,
        password: strict(&record.password)?,
        url: strict(&record.url)?,
        note: strict(&record.note)?,
    };

    let iv = random_iv();
    Ok(EncryptedRecord {
        id: record.id,
        name: encrypt_opt(&fields.name, new_dek, &iv)?,
        username: encrypt_opt(&fields.username, new_dek, &iv)?,
        password: encrypt_opt(&fields.password, new_dek, &iv)?,
        url: encrypt_opt(&fields.url, new_dek, &iv)?,
        note: encrypt_opt(&fields.note, new_dek, &iv)?,
        iv: iv.to_vec(),
        organization: record.organization,
        group_id: record.group_id,
    })
}

/// Decrypts all fields of a record. Infallible by design: a field that
/// cannot be decrypted becomes [`DECRYPT_PLACEHOLDER`] so the caller can
/// still render the rest of a list view.
pub fn decrypt_record(record: &EncryptedRecord, dek: &[u8; KEY_SIZE]) -> RecordFields {
    RecordFields {
        name: decrypt_opt(record.id, "name", &record.name, dek, &record.iv),
        username: decrypt_opt(record.id, "username", &record.username, dek, &record.iv),
        password: decrypt_opt(record.id, "password", &record.password, dek, &record.iv),
        url: decrypt_opt(record.id, "url", &record.url, dek, &record.iv),
        note: decrypt_opt(record.id, "note", &record.note, dek, &record.iv),
    }
}
