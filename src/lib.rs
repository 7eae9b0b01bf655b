//! # graph-crdt — a delta-state graph CRDT core
//!
//! `graph-crdt` is the merge engine behind a peer-to-peer graph database:
//! replicas edit an in-memory graph of [`Node`]s independently, possibly
//! while disconnected, and exchange the partial updates ("deltas") each
//! [`Node::merge`]/[`Graph::merge`] call produces. Any two replicas that
//! have seen the same set of deltas — in any order, any number of times —
//! converge to byte-identical state.
//!
//! This crate is embedded into a host application. It does not open
//! sockets, does not persist to disk, and does not generate wire
//! messages beyond the plain JSON shape `serde`/`serde_json` already give
//! it — transport, storage, and network framing are the host's job.
//!
//! ## Quick Start
//!
//! ```rust
//! use graph_crdt::{FieldMeta, Node};
//! use serde_json::json;
//!
//! // Two independent writers, starting from the same empty node.
//! let mut replica_a = Node::new(Some("user-1".to_string()));
//! let mut replica_b = replica_a.clone();
//!
//! replica_a.set_metadata("name", FieldMeta::new(json!("Ada"), 0)).unwrap();
//! replica_b.set_metadata("name", FieldMeta::new(json!("Grace"), 0)).unwrap();
//!
//! // Exchange deltas: merging b into a and a into b converges both.
//! let delta_a = replica_a.clone();
//! let delta_b = replica_b.clone();
//! replica_a.merge(delta_b).unwrap();
//! replica_b.merge(delta_a).unwrap();
//!
//! assert_eq!(replica_a.snapshot(), replica_b.snapshot());
//! ```
//!
//! ## Architecture
//!
//! Six components, leaves first:
//!
//! - [`clock`]: the per-field Lamport scalar.
//! - [`resolver`]: the total, deterministic tie-break used when two
//!   writes to the same field carry equal clocks.
//! - [`entity`]: [`Entity`] — a keyed collection of versioned fields,
//!   with `delta`/`rebase`/`overlap` as pure, non-mutating operations.
//! - [`node`]: [`Node`] — an `Entity` with a concrete, event-emitting
//!   `merge`.
//! - [`graph`]: [`Graph`] — a keyed collection of `Node`s that composes
//!   `Node` merges into graph-level deltas and supports the same
//!   `rebase`/`overlap` time-travel operations at the whole-graph level.
//! - [`observer`]: the subscribe/emit registry `Node` and `Graph` each
//!   own, firing `update`, `history`, and `conflict` events.
//!
//! ## Data Model
//!
//! A [`Node`] is a soul-identified (`uid`) bag of fields; each field
//! carries a JSON value and a Lamport `state`. A [`Graph`] is a keyed map
//! of `Node`s, indexed by `uid`, iterated in insertion order.
//!
//! ## Conflict Resolution
//!
//! Within a single field, a higher Lamport `state` always wins. When two
//! writes tie at the same `state`, [`resolver::resolve`] breaks the tie
//! by a fixed, total order over the two values — the same total order on
//! every replica, which is what gives this CRDT its convergence
//! guarantee (see [`node::Node::merge`]'s documentation for the exact
//! rule cascade).
//!
//! ## Identifiers
//!
//! [`uid::UidSource`] is the pluggable "give me a universally unique
//! string" interface this crate consumes: `Entity::new`/`Node::new` draw
//! from [`uid::RandomUidSource`] (a `uuid` v4 generator) whenever no
//! explicit `uid` is supplied, and `Entity::new_with`/`Node::new_with`
//! take any `&dyn UidSource` for callers that need a different scheme —
//! a caller may always bypass both and supply its own `uid` directly.
//!
//! ## Non-goals
//!
//! No transport, no persistence, no schema/application semantics of
//! values, no true deletion (tombstones), no user-defined conflict
//! resolvers, no vector clocks, no anti-entropy or membership protocol.

pub mod clock;
pub mod entity;
pub mod error;
pub mod graph;
pub mod node;
pub mod observer;
pub mod resolver;
pub mod uid;
pub mod value;

pub use entity::{Delta, Entity, FieldMeta};
pub use error::{GraphError, GraphResult};
pub use graph::{Graph, GraphDelta, GraphEvent};
pub use node::{MergeInput, Node, NodeEvent};
pub use observer::{EventPayload, Listener, Observer};
pub use resolver::{resolve, Resolution};
pub use uid::{RandomUidSource, UidSource};
pub use value::JsonValue;
