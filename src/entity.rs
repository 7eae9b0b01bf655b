//! Entity: a keyed collection of versioned fields.
//!
//! A single ordered map of `field -> FieldMeta` records, rather than
//! separate data/meta maps, because `delta`/`rebase`/`overlap` need to
//! reason about one field's value and state together, not as two
//! parallel structures.

use crate::clock::{self, ABSENT};
use crate::error::{GraphError, GraphResult};
use crate::resolver::{resolve, Resolution};
use crate::uid::{RandomUidSource, UidSource};
use crate::value::{validate_finite, JsonValue};
use indexmap::IndexMap;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// The reserved metadata key. Never iterated, never returned by `value`,
/// never part of a snapshot, never merged.
pub const OBJECT_KEY: &str = "@object";

/// Per-field metadata: a value, its Lamport state, and any additional
/// opaque keys (linked-list pointers, aggregation flags, …) treated as
/// part of the metadata record rather than as fields to compare.
///
/// The wire shape is flat — `value`, `state`, and `extras` are sibling
/// JSON keys, never nested — so `Serialize`/`Deserialize` are implemented
/// by hand instead of derived, which also lets `state` accept a JSON
/// float on read (fractional states are tolerated but never produced by
/// this crate) while always being written back as an integer.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMeta {
    pub value: JsonValue,
    pub state: u64,
    pub extras: Map<String, JsonValue>,
}

impl FieldMeta {
    pub fn new(value: JsonValue, state: u64) -> Self {
        Self {
            value,
            state,
            extras: Map::new(),
        }
    }
}

impl Serialize for FieldMeta {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(2 + self.extras.len()))?;
        map.serialize_entry("value", &self.value)?;
        map.serialize_entry("state", &self.state)?;
        for (k, v) in &self.extras {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FieldMeta {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let mut obj = Map::deserialize(deserializer)?;
        let value = obj.remove("value").unwrap_or(Value::Null);
        let state = match obj.remove("state") {
            Some(Value::Number(n)) => n.as_f64().map(|f| f.max(0.0) as u64).unwrap_or(0),
            _ => 0,
        };
        Ok(FieldMeta {
            value,
            state,
            extras: obj,
        })
    }
}

/// The result of [`Entity::delta`]: fields that newly won (`update`) and
/// fields that were superseded or lost a tie-break (`history`).
#[derive(Debug, Clone)]
pub struct Delta {
    pub update: Entity,
    pub history: Entity,
}

/// A keyed collection of versioned fields, identified by a stable `uid`.
///
/// `uid` is set at construction and never mutated. The reserved
/// `@object` entry (which would hold `{uid, ...}` on the wire) is tracked
/// out-of-band here as `uid` plus `object_extras`, rather than living
/// inside `fields`, so it can never accidentally leak into iteration,
/// `snapshot`, or merge.
#[derive(Debug, Clone, Serialize)]
#[serde(into = "Map<String, Value>")]
pub struct Entity {
    uid: String,
    object_extras: Map<String, JsonValue>,
    fields: IndexMap<String, FieldMeta>,
}

impl Default for Entity {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Entity {
    /// A fresh entity with the given uid, or one drawn from the default
    /// [`UidSource`] ([`RandomUidSource`]) if omitted.
    pub fn new(uid: Option<String>) -> Self {
        Self::new_with(uid, &RandomUidSource)
    }

    /// A fresh entity with the given uid, or one drawn from `source` if
    /// omitted. The constructor `new` delegates here with
    /// [`RandomUidSource`]; callers that need a different uid scheme (or a
    /// deterministic one, for tests) supply their own [`UidSource`].
    pub fn new_with(uid: Option<String>, source: &dyn UidSource) -> Self {
        Self {
            uid: uid.unwrap_or_else(|| source.next_uid()),
            object_extras: Map::new(),
            fields: IndexMap::new(),
        }
    }

    fn empty_with_uid(uid: String) -> Self {
        Self {
            uid,
            object_extras: Map::new(),
            fields: IndexMap::new(),
        }
    }

    /// Wrap a wire-format object directly: assumes `NodeObject` shape,
    /// no validation beyond extracting `@object.uid`.
    pub fn source(object: &Map<String, JsonValue>) -> GraphResult<Self> {
        let object_meta = object
            .get(OBJECT_KEY)
            .and_then(|v| v.as_object())
            .ok_or_else(|| {
                GraphError::MalformedWire(format!("missing or invalid \"{OBJECT_KEY}\""))
            })?;
        let uid = object_meta
            .get("uid")
            .and_then(|v| v.as_str())
            .ok_or_else(|| GraphError::MalformedWire(format!("\"{OBJECT_KEY}.uid\" missing")))?
            .to_string();
        let mut object_extras = object_meta.clone();
        object_extras.remove("uid");

        let mut fields = IndexMap::new();
        for (key, raw) in object {
            if key == OBJECT_KEY {
                continue;
            }
            let meta: FieldMeta = serde_json::from_value(raw.clone())
                .map_err(|e| GraphError::MalformedWire(format!("field \"{key}\": {e}")))?;
            fields.insert(key.clone(), meta);
        }

        Ok(Self {
            uid,
            object_extras,
            fields,
        })
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Metadata for a field, or the `@object` record if `field` is `None`.
    pub fn meta(&self, field: Option<&str>) -> Option<FieldMeta> {
        match field {
            None => {
                let mut extras = self.object_extras.clone();
                extras.insert("uid".to_string(), Value::String(self.uid.clone()));
                Some(FieldMeta {
                    value: Value::Null,
                    state: 0,
                    extras,
                })
            }
            Some(OBJECT_KEY) => self.meta(None),
            Some(key) => self.fields.get(key).cloned(),
        }
    }

    /// The value of a field, or `None` for unknown or reserved fields.
    pub fn value(&self, field: &str) -> Option<&JsonValue> {
        if field == OBJECT_KEY {
            return None;
        }
        self.fields.get(field).map(|m| &m.value)
    }

    /// The Lamport state of a field, or `0` if absent.
    pub fn state(&self, field: &str) -> u64 {
        if field == OBJECT_KEY {
            return ABSENT;
        }
        self.fields.get(field).map(|m| m.state).unwrap_or(ABSENT)
    }

    /// Write `meta` to `field` with `state = state(field) + 1`; any state
    /// embedded in `meta` is discarded.
    pub fn set_metadata(&mut self, field: &str, mut meta: FieldMeta) -> GraphResult<()> {
        if field == OBJECT_KEY {
            return Err(GraphError::MalformedWire(format!(
                "\"{OBJECT_KEY}\" is reserved and cannot be written as a field"
            )));
        }
        validate_finite(&meta.value)?;
        meta.state = clock::advance(self.state(field));
        self.fields.insert(field.to_string(), meta);
        Ok(())
    }

    /// A plain mapping of every non-reserved `field -> value`.
    pub fn snapshot(&self) -> Map<String, JsonValue> {
        self.fields
            .iter()
            .map(|(k, m)| (k.clone(), m.value.clone()))
            .collect()
    }

    /// Fields present in the receiver. Exposed for iteration by `Node`.
    pub(crate) fn fields(&self) -> &IndexMap<String, FieldMeta> {
        &self.fields
    }

    /// Write a field's metadata verbatim, bypassing the clock advance
    /// `set_metadata` performs. Used by `Node::merge`, which has already
    /// decided the winning metadata (via `delta`/the resolver) and must
    /// not re-derive its state.
    pub(crate) fn put_field(&mut self, key: &str, meta: FieldMeta) {
        self.fields.insert(key.to_string(), meta);
    }

    /// A new entity containing exactly the fields present in both `self`
    /// and `other`, with metadata taken from `self`.
    pub fn overlap(&self, other: &Entity) -> Entity {
        tracing::trace!(uid = %self.uid, other_uid = %other.uid, "computing entity overlap");
        let mut result = Entity::empty_with_uid(self.uid.clone());
        for (key, meta) in &self.fields {
            if other.fields.contains_key(key) {
                result.fields.insert(key.clone(), meta.clone());
            }
        }
        result
    }

    /// A new entity: start from `target`, overlay `self`; for every field
    /// `k` in `self` where `target.state(k) >= self.state(k)`, bump the
    /// state to `target.state(k) + 1` so `self` wins any future merge
    /// against `target`. Metadata is cloned, never aliased.
    pub fn rebase(&self, target: &Entity) -> Entity {
        tracing::trace!(uid = %self.uid, target_uid = %target.uid, "rebasing entity onto target");
        let mut result = Entity {
            uid: self.uid.clone(),
            object_extras: self.object_extras.clone(),
            fields: target.fields.clone(),
        };
        for (key, meta) in &self.fields {
            let mut new_meta = meta.clone();
            let target_state = target.state(key);
            if target_state >= meta.state {
                new_meta.state = clock::advance(target_state);
            }
            result.fields.insert(key.clone(), new_meta);
        }
        result
    }

    /// Compute `{update, history}` against an incoming entity, without
    /// mutating `self`. Both returned entities carry `self`'s uid.
    pub fn delta(&self, update: &Entity) -> Delta {
        let mut upd = Entity::empty_with_uid(self.uid.clone());
        let mut hist = Entity::empty_with_uid(self.uid.clone());

        for (key, incoming_meta) in &update.fields {
            let u = incoming_meta.state;
            let c = self.state(key);

            if u > c {
                upd.fields.insert(key.clone(), incoming_meta.clone());
                if c > 0 {
                    if let Some(current_meta) = self.fields.get(key) {
                        hist.fields.insert(key.clone(), current_meta.clone());
                    }
                }
            } else if u < c {
                hist.fields.insert(key.clone(), incoming_meta.clone());
            } else if let Some(current_meta) = self.fields.get(key) {
                match resolve(current_meta, incoming_meta) {
                    Resolution::B => {
                        upd.fields.insert(key.clone(), incoming_meta.clone());
                        hist.fields.insert(key.clone(), current_meta.clone());
                    }
                    Resolution::A => {
                        // The receiver already holds the winner; nothing to emit.
                    }
                }
            }
            // u == c == 0 with no current field: absence meeting absence,
            // nothing meaningful to emit.
        }

        Delta {
            update: upd,
            history: hist,
        }
    }
}

impl From<Entity> for Map<String, JsonValue> {
    fn from(entity: Entity) -> Self {
        let mut object_meta = entity.object_extras.clone();
        object_meta.insert("uid".to_string(), Value::String(entity.uid.clone()));
        let mut out = Map::new();
        out.insert(OBJECT_KEY.to_string(), Value::Object(object_meta));
        for (key, meta) in &entity.fields {
            out.insert(key.clone(), serde_json::to_value(meta).unwrap_or(Value::Null));
        }
        out
    }
}
