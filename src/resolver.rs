//! The conflict resolver: a total, deterministic tie-break over field
//! metadata pairs with equal clocks.
//!
//! A plain `incoming_state >= existing_state` comparison only has to
//! order *numbers*; once two writes tie on their Lamport state, this
//! resolver has to order arbitrary JSON values instead, so the single
//! `>=` check becomes the six-rule cascade below.
//!
//! The relation is total (any two metadata records are comparable),
//! antisymmetric (`resolve(a, b)` and `resolve(b, a)` name the same
//! underlying record), and independent of caller identity — every replica
//! that runs this resolver on the same pair reaches the same winner.

use crate::entity::FieldMeta;
use crate::value::{canonical_display, canonical_json, deep_eq};
use serde_json::Value;

/// Which side of a [`resolve`] call won.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The first argument (`a`) wins.
    A,
    /// The second argument (`b`) wins.
    B,
}

fn is_compound(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}

/// Resolve a tie between two field metadata records with equal `state`.
///
/// Rules, applied in order — the first that fires decides:
///
/// 1. Structural equality of `a.value`/`b.value` → `a`.
/// 2. Both compound (object or array): compare canonical JSON text
///    lexicographically, greater wins, tie → `a`.
/// 3. One compound, one not: the compound side wins.
/// 4. Both scalar: compare canonical display strings lexicographically,
///    greater wins.
/// 5. Same canonical display string, different types (e.g. `5` vs
///    `"5"`): the non-string side wins.
/// 6. Otherwise: `a`.
pub fn resolve(a: &FieldMeta, b: &FieldMeta) -> Resolution {
    if deep_eq(&a.value, &b.value) {
        return Resolution::A;
    }

    let a_compound = is_compound(&a.value);
    let b_compound = is_compound(&b.value);

    if a_compound && b_compound {
        let ca = canonical_json(&a.value);
        let cb = canonical_json(&b.value);
        return if cb > ca { Resolution::B } else { Resolution::A };
    }

    if a_compound != b_compound {
        return if a_compound { Resolution::A } else { Resolution::B };
    }

    let da = canonical_display(&a.value);
    let db = canonical_display(&b.value);

    if da != db {
        return if db > da { Resolution::B } else { Resolution::A };
    }

    let a_is_string = matches!(a.value, Value::String(_));
    let b_is_string = matches!(b.value, Value::String(_));
    if a_is_string != b_is_string {
        return if a_is_string { Resolution::B } else { Resolution::A };
    }

    tracing::trace!("resolver fell through to the default tie-break (rule 6)");
    Resolution::A
}
