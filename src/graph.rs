//! Graph: a keyed collection of Nodes.
//!
//! A node store keyed by uid (`get`/`put`/`has`/`merge`), built on an
//! insertion-ordered map (`IndexMap`) rather than a `HashMap` so
//! iteration order matches insertion order. `merge` composes each
//! member's `Node::merge` delta into a graph-level delta, rather than
//! applying one node's fields against stored state directly.

use crate::error::{GraphError, GraphResult};
use crate::node::Node;
use crate::observer::{EventPayload, Listener, Observer};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

/// Stable event identifiers.
pub const EVENT_UPDATE: &str = "update";
pub const EVENT_HISTORY: &str = "history";

/// Events a [`Graph`] emits during `merge`. Boxed to break the
/// `Graph -> GraphEvent -> Graph` cycle the compiler would otherwise see
/// as an infinitely-sized type; the indirection costs nothing semantically,
/// `Box<Graph>` is still "a Graph".
#[derive(Debug, Clone)]
pub enum GraphEvent {
    /// Per-node `update` deltas, keyed by uid.
    Update(Box<Graph>),
    /// Per-node `history` deltas, keyed by uid.
    History(Box<Graph>),
}

impl EventPayload for GraphEvent {
    fn kind(&self) -> &'static str {
        match self {
            GraphEvent::Update(_) => EVENT_UPDATE,
            GraphEvent::History(_) => EVENT_HISTORY,
        }
    }
}

/// The `{update, history}` pair a [`Graph::merge`] returns.
#[derive(Debug, Clone)]
pub struct GraphDelta {
    pub update: Graph,
    pub history: Graph,
}

/// What [`Graph::merge`] accepts: another `Graph`, or a plain
/// `{uid: NodeObject, ...}` mapping coerced via [`Graph::source`].
pub enum GraphMergeInput {
    Graph(Graph),
    Mapping(Map<String, Value>),
}

impl From<Graph> for GraphMergeInput {
    fn from(graph: Graph) -> Self {
        GraphMergeInput::Graph(graph)
    }
}

impl From<&Graph> for GraphMergeInput {
    fn from(graph: &Graph) -> Self {
        GraphMergeInput::Graph(graph.clone())
    }
}

impl From<Map<String, Value>> for GraphMergeInput {
    fn from(mapping: Map<String, Value>) -> Self {
        GraphMergeInput::Mapping(mapping)
    }
}

/// A keyed collection of Nodes indexed by their uid.
///
/// Invariants: the key at which a `Node` is stored always equals
/// `node.uid()`; insertion order is preserved by iteration but carries no
/// semantic meaning and is not part of equality; a node appears in the
/// graph after any successful merge that referenced it, even one that
/// delivered no field updates.
#[derive(Debug, Serialize)]
#[serde(into = "Map<String, Value>")]
pub struct Graph {
    nodes: IndexMap<String, Node>,
    #[serde(skip)]
    observer: Observer<GraphEvent>,
}

impl Clone for Graph {
    fn clone(&self) -> Self {
        Graph {
            nodes: self.nodes.clone(),
            observer: Observer::new(),
        }
    }
}

impl From<Graph> for Map<String, Value> {
    fn from(graph: Graph) -> Self {
        graph
            .nodes
            .into_iter()
            .map(|(uid, node)| (uid, serde_json::to_value(node).unwrap_or(Value::Null)))
            .collect()
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    pub fn new() -> Self {
        Self {
            nodes: IndexMap::new(),
            observer: Observer::new(),
        }
    }

    /// An empty graph. The instance-level hook `merge` uses to allocate
    /// its `update`/`history` delta graphs — exists so a caller
    /// generalizing this type could produce tagged empties instead.
    pub fn spawn_empty(&self) -> Graph {
        Graph::new()
    }

    /// Wrap a wire-format `GraphObject` directly: every sub-object must
    /// already be shaped as a `NodeObject`, and the outer key must match
    /// that node's `@object.uid`.
    pub fn source(object: &Map<String, Value>) -> GraphResult<Self> {
        let mut graph = Graph::new();
        for (uid, raw) in object {
            let node_object = raw.as_object().ok_or_else(|| {
                GraphError::MalformedWire(format!("node \"{uid}\" is not an object"))
            })?;
            let node = Node::source(node_object)?;
            if node.uid() != uid {
                return Err(GraphError::MalformedWire(format!(
                    "graph key \"{uid}\" does not match node uid \"{}\"",
                    node.uid()
                )));
            }
            graph.nodes.insert(uid.clone(), node);
        }
        Ok(graph)
    }

    /// The stored node at `uid`, if any.
    pub fn value(&self, uid: &str) -> Option<&Node> {
        self.nodes.get(uid)
    }

    /// Iterate `(uid, Node)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Node)> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Register a listener for `"update"` or `"history"`.
    pub fn on(&mut self, event: &'static str, callback: Listener<GraphEvent>) -> u64 {
        self.observer.on(event, callback)
    }

    /// Deregister a listener by the handle `on` returned.
    pub fn off(&mut self, event: &'static str, id: u64) {
        self.observer.off(event, id);
    }

    /// Merge an incoming graph (or a plain wire mapping) into this one.
    ///
    /// For every `(uid, node)` in `incoming`'s iteration order: find or
    /// create (as an empty shell sharing that uid) the matching member of
    /// `self`, delegate to `Node::merge`, and place the resulting
    /// per-field `update`/`history` entities into two parallel delta
    /// graphs keyed by the same uid — regardless of whether either delta
    /// is empty. Emits `update` then `history` (the reverse of `Node`'s
    /// `history`-then-`update` order; see [`crate::node::Node::merge`]).
    pub fn merge(&mut self, incoming: impl Into<GraphMergeInput>) -> GraphResult<GraphDelta> {
        tracing::debug!(member_count = self.nodes.len(), "merging into graph");
        let incoming_graph = match incoming.into() {
            GraphMergeInput::Graph(g) => g,
            GraphMergeInput::Mapping(m) => Graph::source(&m)?,
        };

        let mut update_graph = self.spawn_empty();
        let mut history_graph = self.spawn_empty();

        for (uid, incoming_node) in incoming_graph.nodes.iter() {
            if !self.nodes.contains_key(uid) {
                self.nodes.insert(uid.clone(), incoming_node.spawn_empty());
            }
            let target = self
                .nodes
                .get_mut(uid)
                .expect("just inserted or already present");
            let delta = target.merge(incoming_node.clone())?;

            update_graph
                .nodes
                .insert(uid.clone(), Node::from_entity(delta.update));
            history_graph
                .nodes
                .insert(uid.clone(), Node::from_entity(delta.history));
        }

        self.observer
            .emit(&GraphEvent::Update(Box::new(update_graph.clone())));
        self.observer
            .emit(&GraphEvent::History(Box::new(history_graph.clone())));

        Ok(GraphDelta {
            update: update_graph,
            history: history_graph,
        })
    }

    /// A fresh graph: merge `target`, then merge `self` on top, then for
    /// every uid present in both replace the entry with
    /// `self[uid].rebase(target[uid])` — advancing `self`'s clocks past
    /// `target`'s so it wins future merges against that target.
    pub fn rebase(&self, target: &Graph) -> GraphResult<Graph> {
        tracing::trace!(
            self_count = self.nodes.len(),
            target_count = target.nodes.len(),
            "rebasing graph onto target"
        );
        let mut result = Graph::new();
        result.merge(target.clone())?;
        result.merge(self.clone())?;

        for (uid, self_node) in self.nodes.iter() {
            if let Some(target_node) = target.value(uid) {
                result
                    .nodes
                    .insert(uid.clone(), self_node.rebase(target_node));
            }
        }

        Ok(result)
    }

    /// A fresh graph containing, for every uid present in both `self` and
    /// `target`, the field-level overlap of the two nodes. Nodes present
    /// in only one side are omitted entirely.
    pub fn overlap(&self, target: &Graph) -> GraphResult<Graph> {
        tracing::trace!(
            self_count = self.nodes.len(),
            target_count = target.nodes.len(),
            "computing graph overlap"
        );
        let mut result = Graph::new();
        for (uid, self_node) in self.nodes.iter() {
            if let Some(target_node) = target.value(uid) {
                let overlapped = self_node.overlap(target_node);
                let mut patch = Graph::new();
                patch.nodes.insert(uid.clone(), overlapped);
                result.merge(patch)?;
            }
        }
        Ok(result)
    }

    /// A plain `uid -> snapshot` mapping across every member node. Not
    /// part of the wire format; a convenience for callers that want the
    /// whole graph's visible state without walking `iter` themselves.
    pub fn snapshot(&self) -> Map<String, Value> {
        self.nodes
            .iter()
            .map(|(uid, node)| (uid.clone(), Value::Object(node.snapshot())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn e5_new_node_via_graph_merge() {
        let mut graph = Graph::new();
        let mut incoming = Graph::new();
        let node =
            Node::from_mapping(Some("u1".into()), &Map::from_iter([("data".to_string(), json!(true))]))
                .unwrap();
        incoming.nodes.insert("u1".to_string(), node);

        let update_events = Rc::new(RefCell::new(0));
        let ue = update_events.clone();
        graph.on(EVENT_UPDATE, Box::new(move |_| *ue.borrow_mut() += 1));

        let delta = graph.merge(incoming).unwrap();

        let stored = graph.value("u1").expect("node should exist after merge");
        assert_eq!(stored.snapshot(), Map::from_iter([("data".to_string(), json!(true))]));

        let delta_node = delta.update.value("u1").expect("delta should carry u1");
        assert_eq!(delta_node.value("data"), Some(&json!(true)));
        assert_eq!(*update_events.borrow(), 1);
    }

    #[test]
    fn unknown_uid_creates_empty_shell_even_with_no_fields() {
        let mut graph = Graph::new();
        let mut incoming = Graph::new();
        incoming.nodes.insert("u1".to_string(), Node::new(Some("u1".into())));

        graph.merge(incoming).unwrap();
        assert!(graph.value("u1").is_some());
    }

    #[test]
    fn e6_rebase_advances_clock_past_target() {
        let mut target = Graph::new();
        let mut target_node = Node::new(Some("u1".into()));
        target_node.entity_mut().put_field("x", crate::entity::FieldMeta::new(json!(1), 5));
        target.nodes.insert("u1".to_string(), target_node);

        let mut me = Graph::new();
        let mut me_node = Node::new(Some("u1".into()));
        me_node.entity_mut().put_field("x", crate::entity::FieldMeta::new(json!(2), 1));
        me.nodes.insert("u1".to_string(), me_node);

        let rebased = me.rebase(&target).unwrap();
        let node = rebased.value("u1").unwrap();
        assert_eq!(node.value("x"), Some(&json!(2)));
        assert_eq!(node.state("x"), 6);
    }

    #[test]
    fn overlap_omits_nodes_present_on_only_one_side() {
        let mut a = Graph::new();
        a.nodes.insert(
            "shared".to_string(),
            Node::from_mapping(Some("shared".into()), &Map::from_iter([("x".to_string(), json!(1))])).unwrap(),
        );
        a.nodes.insert("only_a".to_string(), Node::new(Some("only_a".into())));

        let mut b = Graph::new();
        b.nodes.insert(
            "shared".to_string(),
            Node::from_mapping(Some("shared".into()), &Map::from_iter([("x".to_string(), json!(1))])).unwrap(),
        );

        let result = a.overlap(&b).unwrap();
        assert!(result.value("shared").is_some());
        assert!(result.value("only_a").is_none());
    }

    #[test]
    fn round_trip_through_json_preserves_snapshot() {
        let mut graph = Graph::new();
        let mut incoming = Graph::new();
        incoming.nodes.insert(
            "u1".to_string(),
            Node::from_mapping(Some("u1".into()), &Map::from_iter([("a".to_string(), json!(1))])).unwrap(),
        );
        graph.merge(incoming).unwrap();

        let json_map: Map<String, Value> = graph.clone().into();
        let restored = Graph::source(&json_map).unwrap();

        assert_eq!(restored.snapshot(), graph.snapshot());
    }
}
