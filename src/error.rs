//! Error types for the graph CRDT core.
//!
//! All operations in this crate return [`GraphResult<T>`], a type alias for
//! `Result<T, GraphError>`. Errors arise purely from caller input — a
//! non-finite number reaching merge, or wire data that isn't shaped like a
//! `GraphObject`/`NodeObject`. Merges never partially apply: a `merge` call
//! either fully applies its `update` delta or leaves the receiver
//! unchanged.

use thiserror::Error;

/// Errors the core can surface.
///
/// Errors are synchronous, caller-input-driven, and never retried or
/// logged away internally — a caller decides what to do with them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    /// A value could not be canonicalized — a non-finite number
    /// (`NaN`/`Infinity`) reached a merge or the conflict resolver.
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// A lookup assumed a node exists that does not. No operation in this
    /// core raises this variant itself (`Graph::value` returns `Option`
    /// instead); it exists for callers layering stricter lookups on top.
    #[error("unknown uid: {0}")]
    UnknownUid(String),

    /// `source` was given input that is not shaped like a `GraphObject` or
    /// `NodeObject`: an entry missing `@object`, or a node whose `@object.uid`
    /// doesn't match the key it's stored under.
    #[error("malformed wire data: {0}")]
    MalformedWire(String),
}

/// Result type alias for graph CRDT operations.
pub type GraphResult<T> = Result<T, GraphError>;
