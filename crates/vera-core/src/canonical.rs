//! # Canonical Serialization: JCS-Compatible Canonicalization
//!
//! This module defines [`CanonicalBytes`], the sole construction path for bytes
//! used as signing input or digest input across the agent.
//!
//! ## Security Invariant
//!
//! The inner `Vec<u8>` is private. The only way to obtain `CanonicalBytes` is
//! through [`CanonicalBytes::new()`] or [`CanonicalBytes::from_value()`], both
//! of which apply the full coercion pipeline. Two documents that differ only in
//! key order or whitespace therefore produce identical bytes, and a signature
//! can never be computed over a non-canonical rendering.
//!
//! ## Coercion Rules
//!
//! 1. Reject floats: numeric claims must be integers or strings.
//! 2. Sort object keys lexicographically (by UTF-8 bytes).
//! 3. Use compact separators (no whitespace).
//!
//! String values pass through byte for byte. A datetime claim is signed as
//! written, so `.100Z` and `.999Z` never share a signing input.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Bytes produced exclusively by JCS-compatible canonicalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Construct canonical bytes from any serializable value.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        Self::from_value(value)
    }

    /// Construct canonical bytes from an already-materialized JSON value.
    pub fn from_value(value: Value) -> Result<Self, CanonicalizationError> {
        let coerced = coerce_json_value(value)?;
        let mut out = Vec::new();
        write_canonical(&coerced, &mut out)?;
        Ok(Self(out))
    }

    /// Access the canonical bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume and return the inner byte vector.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the canonical form is empty (never true for valid JSON).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Recursively coerce JSON values according to the canonicalization rules.
fn coerce_json_value(value: Value) -> Result<Value, CanonicalizationError> {
    match value {
        Value::Number(n) => {
            if n.is_f64() {
                return Err(CanonicalizationError::FloatRejected(
                    n.as_f64().unwrap_or(f64::NAN),
                ));
            }
            Ok(Value::Number(n))
        }
        Value::Object(map) => {
            let mut coerced = serde_json::Map::new();
            for (k, v) in map {
                coerced.insert(k, coerce_json_value(v)?);
            }
            Ok(Value::Object(coerced))
        }
        Value::Array(arr) => {
            let coerced: Result<Vec<_>, _> = arr.into_iter().map(coerce_json_value).collect();
            Ok(Value::Array(coerced?))
        }
        other => Ok(other),
    }
}

/// Write a JSON value with sorted keys and compact separators.
///
/// Key order is enforced here rather than relying on the map implementation
/// behind `serde_json::Map`, which changes when any crate in the build enables
/// `preserve_order`.
fn write_canonical(value: &Value, out: &mut Vec<u8>) -> Result<(), CanonicalizationError> {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push(b'{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                out.extend_from_slice(serde_json::to_string(key)?.as_bytes());
                out.push(b':');
                if let Some(v) = map.get(key) {
                    write_canonical(v, out)?;
                }
            }
            out.push(b'}');
        }
        Value::Array(arr) => {
            out.push(b'[');
            for (i, v) in arr.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_canonical(v, out)?;
            }
            out.push(b']');
        }
        scalar => out.extend_from_slice(serde_json::to_string(scalar)?.as_bytes()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_are_sorted() {
        let cb = CanonicalBytes::new(&json!({"b": 1, "a": 2, "c": {"z": 1, "y": 2}})).unwrap();
        assert_eq!(
            std::str::from_utf8(cb.as_bytes()).unwrap(),
            r#"{"a":2,"b":1,"c":{"y":2,"z":1}}"#
        );
    }

    #[test]
    fn floats_rejected() {
        let err = CanonicalBytes::new(&json!({"amount": 1.5})).unwrap_err();
        assert!(matches!(err, CanonicalizationError::FloatRejected(_)));
    }

    #[test]
    fn datetime_strings_are_kept_verbatim() {
        let cb = CanonicalBytes::new(&json!({"t": "2026-01-15T14:00:00.123+02:00"})).unwrap();
        assert_eq!(
            std::str::from_utf8(cb.as_bytes()).unwrap(),
            r#"{"t":"2026-01-15T14:00:00.123+02:00"}"#
        );

        let a = CanonicalBytes::new(&json!({"t": "2024-01-01T00:00:00.100Z"})).unwrap();
        let b = CanonicalBytes::new(&json!({"t": "2024-01-01T00:00:00.999Z"})).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn array_order_preserved() {
        let cb = CanonicalBytes::new(&json!(["b", "a"])).unwrap();
        assert_eq!(cb.as_bytes(), br#"["b","a"]"#);
    }

    #[test]
    fn strings_are_escaped() {
        let cb = CanonicalBytes::new(&json!({"q": "say \"hi\""})).unwrap();
        assert_eq!(cb.as_bytes(), br#"{"q":"say \"hi\""}"#);
    }

    #[test]
    fn key_order_does_not_change_bytes() {
        let a: Value = serde_json::from_str(r#"{"x":1,"y":[1,2],"z":"s"}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{ "z" : "s", "y" : [1, 2], "x" : 1 }"#).unwrap();
        assert_eq!(
            CanonicalBytes::from_value(a).unwrap(),
            CanonicalBytes::from_value(b).unwrap()
        );
    }
}
