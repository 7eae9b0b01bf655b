//! Node: an Entity with a concrete `merge`.
//!
//! The unit of CRDT state and the unit of event emission are the same
//! type here: merge's state-wins comparison (generalized from "compare
//! two numeric states" to "compute a full `{update, history}` delta via
//! `Entity::delta`, then apply it") is wired straight into an event
//! emitter that fires `conflict`, then `history`, then `update` on every
//! call.

use crate::clock;
use crate::entity::{Delta, Entity, FieldMeta, OBJECT_KEY};
use crate::error::GraphResult;
use crate::observer::{EventPayload, Listener, Observer};
use crate::uid::UidSource;
use crate::value::validate_finite;
use serde::Serialize;
use serde_json::{Map, Value};

/// Stable event identifiers.
pub const EVENT_UPDATE: &str = "update";
pub const EVENT_HISTORY: &str = "history";
pub const EVENT_CONFLICT: &str = "conflict";

/// Events a [`Node`] emits during `merge`.
#[derive(Debug, Clone)]
pub enum NodeEvent {
    /// Fields that newly won. Carries an entity whose fields are exactly
    /// the affected ones.
    Update(Entity),
    /// Fields that were superseded or lost a tie-break.
    History(Entity),
    /// A field-level tie was broken. `winner` is the metadata now held by
    /// the receiver; `loser` is what it replaced.
    Conflict { winner: FieldMeta, loser: FieldMeta },
}

impl EventPayload for NodeEvent {
    fn kind(&self) -> &'static str {
        match self {
            NodeEvent::Update(_) => EVENT_UPDATE,
            NodeEvent::History(_) => EVENT_HISTORY,
            NodeEvent::Conflict { .. } => EVENT_CONFLICT,
        }
    }
}

/// What `Node::merge` accepts: another `Node`, or a plain field->value
/// mapping synthesized into an in-process write.
pub enum MergeInput {
    Node(Node),
    Mapping(Map<String, Value>),
}

impl From<Node> for MergeInput {
    fn from(node: Node) -> Self {
        MergeInput::Node(node)
    }
}

impl From<&Node> for MergeInput {
    fn from(node: &Node) -> Self {
        MergeInput::Node(node.clone())
    }
}

impl From<Map<String, Value>> for MergeInput {
    fn from(mapping: Map<String, Value>) -> Self {
        MergeInput::Mapping(mapping)
    }
}

/// A keyed collection of versioned fields with a stable `uid` and a
/// concrete, convergent merge operation.
///
/// `Node` is a value object: constructed empty or from wire data, and
/// mutated only through `merge`/`set_metadata`. Clones never share the
/// original's listener registry — listeners belong to the live replica
/// a host application is actually observing, not to data that merely has
/// the same shape (a delta, or a value fetched for inspection).
#[derive(Debug, Serialize)]
#[serde(into = "Map<String, Value>")]
pub struct Node {
    entity: Entity,
    #[serde(skip)]
    observer: Observer<NodeEvent>,
}

impl Clone for Node {
    fn clone(&self) -> Self {
        Node {
            entity: self.entity.clone(),
            observer: Observer::new(),
        }
    }
}

impl From<Node> for Map<String, Value> {
    fn from(node: Node) -> Self {
        node.entity.into()
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Node {
    /// An empty node, with the given uid or one drawn from the default
    /// [`UidSource`] if omitted.
    pub fn new(uid: Option<String>) -> Self {
        Self {
            entity: Entity::new(uid),
            observer: Observer::new(),
        }
    }

    /// An empty node, with the given uid or one drawn from `source` if
    /// omitted. Delegates to [`Entity::new_with`].
    pub fn new_with(uid: Option<String>, source: &dyn UidSource) -> Self {
        Self {
            entity: Entity::new_with(uid, source),
            observer: Observer::new(),
        }
    }

    /// Wrap a wire-format `NodeObject` directly.
    pub fn source(object: &Map<String, Value>) -> GraphResult<Self> {
        Ok(Self {
            entity: Entity::source(object)?,
            observer: Observer::new(),
        })
    }

    /// A node whose fields are initialized from a plain mapping at the
    /// minimum "present" state, `1`.
    pub fn from_mapping(uid: Option<String>, mapping: &Map<String, Value>) -> GraphResult<Self> {
        let mut entity = Entity::new(uid);
        for (key, value) in mapping {
            if key == OBJECT_KEY {
                continue;
            }
            validate_finite(value)?;
            entity.put_field(key, FieldMeta::new(value.clone(), clock::initial()));
        }
        Ok(Self {
            entity,
            observer: Observer::new(),
        })
    }

    /// An empty node carrying the same uid as `self`. The instance-level
    /// hook `Graph::merge` uses to create a shell for an unknown uid.
    pub fn spawn_empty(&self) -> Node {
        Node::new(Some(self.uid().to_string()))
    }

    /// Wrap an already-computed entity (e.g. a delta) as a fresh,
    /// listener-less node sharing its uid. Crate-internal: callers outside
    /// this crate build nodes through `new`/`source`/`from_mapping`.
    pub(crate) fn from_entity(entity: Entity) -> Self {
        Node {
            entity,
            observer: Observer::new(),
        }
    }

    pub fn uid(&self) -> &str {
        self.entity.uid()
    }

    pub fn meta(&self, field: Option<&str>) -> Option<FieldMeta> {
        self.entity.meta(field)
    }

    pub fn value(&self, field: &str) -> Option<&Value> {
        self.entity.value(field)
    }

    pub fn state(&self, field: &str) -> u64 {
        self.entity.state(field)
    }

    pub fn snapshot(&self) -> Map<String, Value> {
        self.entity.snapshot()
    }

    pub fn set_metadata(&mut self, field: &str, meta: FieldMeta) -> GraphResult<()> {
        self.entity.set_metadata(field, meta)
    }

    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    #[cfg(test)]
    pub(crate) fn entity_mut(&mut self) -> &mut Entity {
        &mut self.entity
    }

    /// The fields present in both `self` and `other`, with metadata taken
    /// from `self`.
    pub fn overlap(&self, other: &Node) -> Node {
        Node {
            entity: self.entity.overlap(&other.entity),
            observer: Observer::new(),
        }
    }

    /// `self`'s changes re-applied on top of `target`, with clocks
    /// advanced so `self` wins future merges against `target`.
    pub fn rebase(&self, target: &Node) -> Node {
        Node {
            entity: self.entity.rebase(&target.entity),
            observer: Observer::new(),
        }
    }

    /// Register a listener for `"update"`, `"history"`, or `"conflict"`.
    /// Returns a handle for [`Node::off`].
    pub fn on(&mut self, event: &'static str, callback: Listener<NodeEvent>) -> u64 {
        self.observer.on(event, callback)
    }

    /// Deregister a listener by the handle `on` returned.
    pub fn off(&mut self, event: &'static str, id: u64) {
        self.observer.off(event, id);
    }

    /// Apply an incoming node (or a plain write) to this node.
    ///
    /// 1. A plain mapping is first synthesized into a node where every
    ///    field's state is `self.state(field) + 1` — a local write always
    ///    advances its own clock.
    /// 2. `d = self.entity.delta(incoming)`.
    /// 3. Every field in `d.update` is written back; if the field tied
    ///    (`self.state(k) == incoming.state(k)`), a `conflict` event
    ///    fires first with `(winner, loser)`.
    /// 4. If `d.history` is non-empty, `history` fires.
    /// 5. If `d.update` is non-empty, `update` fires.
    /// 6. `d` is returned.
    pub fn merge(&mut self, incoming: impl Into<MergeInput>) -> GraphResult<Delta> {
        tracing::debug!(uid = %self.uid(), "merging into node");
        let incoming_entity = match incoming.into() {
            MergeInput::Node(node) => node.entity,
            MergeInput::Mapping(mapping) => {
                let mut synthetic = Entity::new(Some(self.uid().to_string()));
                for (key, value) in &mapping {
                    if key == OBJECT_KEY {
                        continue;
                    }
                    validate_finite(value)?;
                    let next_state = clock::advance(self.state(key));
                    synthetic.put_field(key, FieldMeta::new(value.clone(), next_state));
                }
                synthetic
            }
        };

        let delta = self.entity.delta(&incoming_entity);

        for (key, new_meta) in delta.update.fields() {
            if self.entity.state(key) == incoming_entity.state(key) {
                if let Some(old_meta) = self.entity.fields().get(key) {
                    tracing::debug!(uid = %self.uid(), field = %key, "resolved field-level conflict");
                    self.observer.emit(&NodeEvent::Conflict {
                        winner: new_meta.clone(),
                        loser: old_meta.clone(),
                    });
                }
            }
            self.entity.put_field(key, new_meta.clone());
        }

        if !delta.history.fields().is_empty() {
            self.observer.emit(&NodeEvent::History(delta.history.clone()));
        }
        if !delta.update.fields().is_empty() {
            self.observer.emit(&NodeEvent::Update(delta.update.clone()));
        }

        Ok(delta)
    }
}
