//! Per-field Lamport clock.
//!
//! A monotonic integer scalar, not a wall-clock timestamp: wall clocks
//! drift across machines and can go backwards, which breaks the "higher
//! always wins" comparison a deterministic merge depends on. A field's
//! clock lives in its own `FieldMeta.state`; there is nothing here to
//! share across fields or replicas.

/// `state(k) = 0` means absent; the first write to a field takes it to `1`.
pub const ABSENT: u64 = 0;

/// The state a brand-new field receives on its first write.
pub fn initial() -> u64 {
    ABSENT + 1
}

/// Advance a field's clock by one local write.
pub fn advance(state: u64) -> u64 {
    state.saturating_add(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_is_one() {
        assert_eq!(initial(), 1);
    }

    #[test]
    fn advance_is_monotone() {
        let mut s = ABSENT;
        for _ in 0..5 {
            let next = advance(s);
            assert!(next > s);
            s = next;
        }
    }
}
