//! Reference-id derivation.
//!
//! Caller-supplied identifiers (and reference values) are never stored
//! directly; they map deterministically onto fixed-width storage keys so
//! that arbitrary source identifiers fit one primary-key shape.

use std::fmt::Write;

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{Result, StrataError};

/// Width of a derived storage key, in characters.
pub const REF_ID_LEN: usize = 40;

/// Derive the 40-character storage key for a caller-supplied identifier.
///
/// Lowercase hex of the leading bytes of a SHA-256 digest; deterministic
/// for the lifetime of the data.
pub fn ref_id(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    let mut out = String::with_capacity(REF_ID_LEN);
    for byte in digest.iter().take(REF_ID_LEN / 2) {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Derive a storage key from a JSON identifier value.
///
/// Strings and numbers are accepted; anything else cannot name a record.
pub fn ref_id_value(value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(ref_id(s)),
        Value::Number(n) => Ok(ref_id(&n.to_string())),
        other => Err(StrataError::Serialization(format!(
            "cannot derive a reference id from: {other}"
        ))),
    }
}
