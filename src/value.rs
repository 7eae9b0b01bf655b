//! JSON value validation and canonical forms.
//!
//! Field values are arbitrary JSON-encodable data: `serde_json::Value`
//! already is the `Null | Bool | Number | String | Array | Object` tagged
//! union this core needs, so this module re-exports it rather than
//! inventing a parallel one.
//!
//! Validation here rejects `NaN`/`Infinity` anywhere in a value tree and
//! accepts everything else, recursively over the full JSON tree a graph
//! CRDT field value may hold (not just flat scalars), and adds the two
//! canonical string forms the resolver needs to impose its total order.

use crate::error::{GraphError, GraphResult};
use serde_json::Value;

/// The value type stored in field metadata. An alias, not a newtype: the
/// full `serde_json::Value` tree is already the tagged union this crate
/// needs.
pub type JsonValue = Value;

/// Reject non-finite numbers anywhere in a value tree.
///
/// `serde_json::Value` cannot itself hold `NaN`/`Infinity` when produced
/// through ordinary JSON parsing or the `From<f64>` conversions (those
/// paths fold non-finite floats to `Null`), but a value can still reach
/// this crate by direct construction (e.g. `Value::Number` built from a
/// `serde_json::Number` assembled by hand), so the check is real, not
/// decorative.
pub fn validate_finite(value: &JsonValue) -> GraphResult<()> {
    match value {
        Value::Number(n) => {
            if let Some(f) = n.as_f64() {
                if !f.is_finite() {
                    tracing::error!("rejecting non-finite number: {} (NaN or Infinity)", f);
                    return Err(GraphError::InvalidValue(format!(
                        "non-finite number: {f}"
                    )));
                }
            }
            Ok(())
        }
        Value::Array(items) => {
            for item in items {
                validate_finite(item)?;
            }
            Ok(())
        }
        Value::Object(map) => {
            for v in map.values() {
                validate_finite(v)?;
            }
            Ok(())
        }
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(()),
    }
}

/// Deep structural equality over JSON values (rule 1 of the resolver).
pub fn deep_eq(a: &JsonValue, b: &JsonValue) -> bool {
    a == b
}

/// Canonical JSON text: keys sorted, numbers in shortest round-trip form,
/// strings JSON-escaped. Used to order two object (or array) values
/// against each other (resolver rules 2/3).
pub fn canonical_json(value: &JsonValue) -> String {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = String::from("{");
            for (i, k) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(k).unwrap_or_default());
                out.push(':');
                out.push_str(&canonical_json(&map[*k]));
            }
            out.push('}');
            out
        }
        Value::Array(items) => {
            let mut out = String::from("[");
            for (i, v) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&canonical_json(v));
            }
            out.push(']');
            out
        }
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

/// Canonical *display* string: the coercion a scalar undergoes for the
/// resolver's lexicographic scalar comparison (rule 4) and its
/// same-string-different-type tie-break (rule 5). Unlike
/// [`canonical_json`], strings are rendered without surrounding quotes,
/// which is exactly what lets a number and its string form collide here
/// and fall into rule 5 (`5` vs `"5"` both display as `5`).
pub fn canonical_display(value: &JsonValue) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => canonical_json(value),
    }
}
