//! Identifier generation: the opaque "give me a universally unique
//! string" interface the core consumes.
//!
//! The default implementation reaches for the `uuid` crate rather than a
//! bespoke base36-timestamp-plus-random scheme: this core has no wire
//! compatibility constraint with an external soul generator to honor, so
//! a standard v4 UUID is the simplest thing that satisfies "never
//! collides."

use uuid::Uuid;

/// A source of globally unique identifiers for new `Entity`/`Node` uids.
/// Consumed as an interface: the core never assumes a specific scheme,
/// only that two calls never return the same string.
pub trait UidSource {
    fn next_uid(&self) -> String;
}

/// The default uid source: a random (v4) UUID per call.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomUidSource;

impl UidSource for RandomUidSource {
    fn next_uid(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_source_never_repeats() {
        let source = RandomUidSource;
        let a = source.next_uid();
        let b = source.next_uid();
        assert_ne!(a, b);
        assert!(!a.is_empty());
    }
}
