//! Canonical Hashing
//!
//! Deterministic serialization + SHA-256 over projections and site
//! indexes. Determinism comes from the types: ordered maps everywhere,
//! vectors sorted during replay, patch data kept in insertion order.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Compact UTF-8 JSON, no whitespace.
pub fn canonical_serialize<T: Serialize + ?Sized>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).expect("canonical_serialize: projection types always serialize")
}

/// SHA-256 of the canonical serialization. Lowercase hex.
pub fn canonical_hash<T: Serialize + ?Sized>(value: &T) -> String {
    hex_digest(&canonical_serialize(value))
}

/// Lowercase hex SHA-256 of raw bytes.
pub fn hex_digest(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}
