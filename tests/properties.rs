//! Universal properties of merge, as `proptest` properties: idempotence,
//! commutativity, associativity, monotone clocks, resolver totality,
//! round-trip, and delta faithfulness. The concrete end-to-end scenarios
//! (E1-E6) live in `node_scenarios.rs`/`graph_scenarios.rs`.

use graph_crdt::{FieldMeta, Node};
use proptest::prelude::*;
use serde_json::{json, Value};

fn arb_json_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(|n| json!(n)),
        "[a-z]{1,8}".prop_map(Value::String),
    ]
}

fn arb_field_name() -> impl Strategy<Value = String> {
    "[a-z]{1,4}"
}

/// A node built from a handful of independent field writes, each at a
/// distinct field name, state 1.
fn arb_delta_node(uid: &'static str) -> impl Strategy<Value = Node> {
    prop::collection::vec((arb_field_name(), arb_json_scalar()), 1..5).prop_map(move |pairs| {
        let mapping: serde_json::Map<String, Value> = pairs.into_iter().collect();
        Node::from_mapping(Some(uid.to_string()), &mapping).unwrap()
    })
}

proptest! {
    /// 1. Idempotence: merging the same delta twice leaves state
    /// unchanged and the second `update` delta is empty.
    #[test]
    fn idempotence(delta in arb_delta_node("u1")) {
        let mut n = Node::new(Some("u1".to_string()));
        n.merge(delta.clone()).unwrap();
        let snapshot_once = n.snapshot();

        let d = n.merge(delta).unwrap();
        prop_assert_eq!(n.snapshot(), snapshot_once);
        prop_assert!(d.update.snapshot().is_empty());
    }

    /// 2. Commutativity: merging two independent deltas in either order
    /// converges to the same snapshot.
    #[test]
    fn commutativity(a in arb_delta_node("u1"), b in arb_delta_node("u1")) {
        let mut n1 = Node::new(Some("u1".to_string()));
        n1.merge(a.clone()).unwrap();
        n1.merge(b.clone()).unwrap();

        let mut n2 = Node::new(Some("u1".to_string()));
        n2.merge(b).unwrap();
        n2.merge(a).unwrap();

        prop_assert_eq!(n1.snapshot(), n2.snapshot());
    }

    /// 3. Associativity: grouping three deltas differently converges to
    /// the same snapshot.
    #[test]
    fn associativity(a in arb_delta_node("u1"), b in arb_delta_node("u1"), c in arb_delta_node("u1")) {
        let mut left = Node::new(Some("u1".to_string()));
        left.merge(a.clone()).unwrap();
        left.merge(b.clone()).unwrap();
        left.merge(c.clone()).unwrap();

        let mut right = Node::new(Some("u1".to_string()));
        right.merge(a).unwrap();
        right.merge(b).unwrap();
        right.merge(c).unwrap();

        prop_assert_eq!(left.snapshot(), right.snapshot());
    }

    /// 4. Monotone clocks: after any sequence of merges, every field's
    /// state only ever goes up.
    #[test]
    fn monotone_clocks(deltas in prop::collection::vec(arb_delta_node("u1"), 1..5)) {
        let mut n = Node::new(Some("u1".to_string()));
        let mut last_states: std::collections::HashMap<String, u64> = std::collections::HashMap::new();

        for delta in deltas {
            n.merge(delta.clone()).unwrap();
            for (field, _) in delta.snapshot() {
                let state = n.state(&field);
                let prev = *last_states.get(&field).unwrap_or(&0);
                prop_assert!(state >= prev);
                last_states.insert(field, state);
            }
        }
    }

    /// 5. Resolver totality: for equal-state metadata, resolve is total
    /// and agrees with itself regardless of argument order (whichever
    /// underlying record won stays the winner).
    #[test]
    fn resolver_totality(va in arb_json_scalar(), vb in arb_json_scalar()) {
        let a = FieldMeta::new(va, 1);
        let b = FieldMeta::new(vb, 1);
        let ab = graph_crdt::resolve(&a, &b);
        let ba = graph_crdt::resolve(&b, &a);
        match (ab, ba) {
            (graph_crdt::Resolution::A, graph_crdt::Resolution::B)
            | (graph_crdt::Resolution::B, graph_crdt::Resolution::A) => {}
            (graph_crdt::Resolution::A, graph_crdt::Resolution::A)
                if a.value == b.value => {}
            other => prop_assert!(false, "resolver not self-consistent: {:?}", other),
        }
    }

    /// 6. Round-trip: serializing a graph to JSON and parsing it back
    /// preserves every node's snapshot.
    #[test]
    fn round_trip(delta in arb_delta_node("u1")) {
        let mut graph = graph_crdt::Graph::new();
        let wire = serde_json::Map::from_iter([(
            "u1".to_string(),
            serde_json::to_value(delta).unwrap(),
        )]);
        let patch = graph_crdt::Graph::source(&wire).unwrap();
        graph.merge(patch).unwrap();

        let json_map: serde_json::Map<String, Value> = graph.clone().into();
        let restored = graph_crdt::Graph::source(&json_map).unwrap();
        prop_assert_eq!(restored.snapshot(), graph.snapshot());
    }

    /// 7. Delta faithfulness: applying just the `update` half of a delta
    /// to a fresh clone of the pre-merge receiver reproduces the
    /// post-merge snapshot. The delta's fields carry their own Lamport
    /// states, so it is replayed as a wire-sourced node (preserving
    /// those states) rather than as a plain value mapping (which would
    /// re-derive states from the replica's own clock).
    #[test]
    fn delta_faithfulness(seed in arb_delta_node("u1"), incoming in arb_delta_node("u1")) {
        let mut receiver = Node::new(Some("u1".to_string()));
        receiver.merge(seed).unwrap();
        let pre_merge = receiver.clone();

        let d = receiver.merge(incoming).unwrap();

        let update_wire: serde_json::Map<String, Value> = d.update.into();
        let update_node = graph_crdt::Node::source(&update_wire).unwrap();

        let mut replay = pre_merge;
        replay.merge(update_node).unwrap();
        prop_assert_eq!(replay.snapshot(), receiver.snapshot());
    }
}

