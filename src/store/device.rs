//! Pseudo-device identifiers.

use crate::base::storeerror::StoreError;

const DEVICE_ID_BYTES: usize = 6;

/// Generate a fresh device identifier: 12 uppercase hex characters.
pub fn generate_device_id() -> Result<String, StoreError> {
    let mut bytes = [0u8; DEVICE_ID_BYTES];
    boring::rand::rand_bytes(&mut bytes)
        .map_err(|e| StoreError::auth_rejected(format!("device id generation failed: {e}")))?;
    Ok(bytes.iter().map(|b| format!("{b:02X}")).collect())
}

/// Whether `id` has the shape of a generated identifier.
pub fn is_valid_device_id(id: &str) -> bool {
    id.len() == DEVICE_ID_BYTES * 2
        && id
            .chars()
            .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
}
