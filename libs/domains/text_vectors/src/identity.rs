//! Storage key derivation.
//!
//! Vector store points are addressed by UUID. Callers address records by an
//! arbitrary string id, so the id is hashed into the UUID space. Same id, same
//! key, across processes, with no lookup table.

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Hyphenated UUID text length (`8-4-4-4-12`).
const HYPHENATED_LEN: usize = 36;

/// Derives the storage key for an optional caller id.
///
/// - `None` → a fresh random key.
/// - An id that already is a hyphenated UUID → that UUID.
/// - Anything else → SHA-256 of the id, truncated to 16 bytes, stamped as a
///   version 8 (custom) RFC 4122 UUID.
pub fn derive_key(id: Option<&str>) -> Uuid {
    match id {
        None => Uuid::new_v4(),
        Some(id) => native_key(id).unwrap_or_else(|| hashed_key(id)),
    }
}

/// Whether `id` is already in the vector store's native key format.
pub fn is_native_key(id: &str) -> bool {
    native_key(id).is_some()
}

fn native_key(id: &str) -> Option<Uuid> {
    if id.len() != HYPHENATED_LEN {
        return None;
    }
    Uuid::try_parse(id).ok()
}

fn hashed_key(id: &str) -> Uuid {
    let digest = Sha256::digest(id.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);

    // version 8, RFC 4122 variant
    bytes[6] = (bytes[6] & 0x0f) | 0x80;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    Uuid::from_bytes(bytes)
}
