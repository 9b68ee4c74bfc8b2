// SPDX-License-Identifier: Apache-2.0
//! Content hashing over canonical JSON.
//!
//! `ContentHash` mirrors the `BlobHash` newtype shape used for blob storage
//! in comparable content-addressed systems: a thin wrapper over raw BLAKE3
//! bytes with a lowercase-hex `Display` impl, `Ord` so hashes can key sorted
//! maps, and no public constructor other than hashing (you cannot forge one
//! from nothing).

use serde_json::{Map, Value};

/// A 32-byte BLAKE3 content hash, rendered as lowercase hex.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// View the hash as raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Build a `ContentHash` from raw bytes without hashing anything.
    ///
    /// Used to round-trip hashes read back from storage; never call this
    /// with bytes that were not themselves a BLAKE3 digest of the record
    /// they claim to identify.
    #[must_use]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse a lowercase-hex hash of exactly 64 characters.
    pub fn from_hex(s: &str) -> Option<Self> {
        if s.len() != 64 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let mut out = [0u8; 32];
        for (i, chunk) in out.iter_mut().enumerate() {
            *chunk = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16).ok()?;
        }
        Some(Self(out))
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// The field every hashed record carries, dropped before rehashing.
pub const HASH_FIELD: &str = "_hash";

/// Compute the canonical content hash of a JSON value.
///
/// Canonicalization is `serde_json`'s default object representation (a
/// sorted `BTreeMap`-backed [`Map`]), so object key order never affects the
/// hash. Array order **does** affect the hash — callers that need
/// set-like, order-independent hashing over an array field (`SliceIds.add`,
/// `InsertHistoryRow.previous`) must sort that field before calling this.
#[must_use]
pub fn calc_hash(value: &Value) -> ContentHash {
    // `to_vec` on a `Value` never fails: there is no writer to error and no
    // non-finite float or non-UTF8 map key can appear in a `Value`.
    let bytes = serde_json::to_vec(value).unwrap_or_default();
    ContentHash(*blake3::hash(&bytes).as_bytes())
}

/// Structural-hash removal: drop `_hash` from `value` and every nested
/// object, recursively. A left inverse for rehashing — `calc_hash(rmhsh(x))
/// == x._hash` whenever `x` was produced by hashing `rmhsh(x)` in the first
/// place.
#[must_use]
pub fn rmhsh(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (k, v) in map {
                if k == HASH_FIELD {
                    continue;
                }
                out.insert(k.clone(), rmhsh(v));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(rmhsh).collect()),
        other => other.clone(),
    }
}

/// Hash `value` after removing any existing `_hash` field, returning a copy
/// of `value` with `_hash` set to the freshly computed hash.
#[must_use]
pub fn with_hash(value: &Value) -> Value {
    let clean = rmhsh(value);
    let hash = calc_hash(&clean);
    let mut out = match clean {
        Value::Object(map) => map,
        other => {
            // Non-object payloads are still hashable; wrap so `_hash` has a
            // place to live without corrupting the original shape.
            let mut m = Map::new();
            m.insert("_value".to_string(), other);
            m
        }
    };
    out.insert(HASH_FIELD.to_string(), Value::String(hash.to_string()));
    Value::Object(out)
}
