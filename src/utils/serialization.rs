// src/utils/serialization.rs
//! Canonical serialization for the exchange protocol.
//!
//! The canonical encoding is the compact JSON serialization of a record (or
//! of one of its payload views): struct fields in declaration order, map
//! entries in `BTreeMap` order. Signing and verification both re-encode
//! through this one function, so the encoding is self-consistent within a
//! deployment; byte-for-byte interoperability with other implementations is
//! not promised.

use serde::Serialize;

/// Serializes a record to its canonical byte encoding.
///
/// # Arguments
/// * `record` - The value to encode (must implement `Serialize`)
///
/// # Returns
/// - `Ok(Vec<u8>)` with the canonical bytes on success
/// - `Err(serde_json::Error)` if serialization fails
pub fn to_canonical_bytes<T: Serialize>(record: &T) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(record)
}
