//! Timestamps used for last-writer-wins conflict resolution
//!
//! A [`Timestamp`] is a `(term, sequence)` pair ordered lexicographically. The
//! term changes when the authority issuing timestamps for a device changes;
//! the sequence increases for every mutation within a term.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Totally ordered recency marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp {
    term: u64,
    sequence: u64,
}

impl Timestamp {
    /// Create a timestamp
    pub const fn new(term: u64, sequence: u64) -> Self {
        Self { term, sequence }
    }

    /// Authority term
    pub fn term(&self) -> u64 {
        self.term
    }

    /// Sequence within the term
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Strictly newer than `other`
    pub fn is_newer_than(&self, other: &Timestamp) -> bool {
        self > other
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.term, self.sequence)
    }
}

/// A value paired with the timestamp at which it was asserted
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Timestamped<T> {
    value: T,
    timestamp: Timestamp,
}

impl<T> Timestamped<T> {
    /// Pair a value with its timestamp
    pub fn new(value: T, timestamp: Timestamp) -> Self {
        Self { value, timestamp }
    }

    /// The wrapped value
    pub fn value(&self) -> &T {
        &self.value
    }

    /// When the value was asserted
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Unwrap the value
    pub fn into_value(self) -> T {
        self.value
    }

    /// Strictly newer than `timestamp`
    pub fn is_newer_than(&self, timestamp: &Timestamp) -> bool {
        self.timestamp.is_newer_than(timestamp)
    }

    /// Strictly newer than `other`
    pub fn is_newer(&self, other: &Timestamped<T>) -> bool {
        self.is_newer_than(&other.timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn term_dominates_sequence() {
        assert!(Timestamp::new(2, 0).is_newer_than(&Timestamp::new(1, 99)));
        assert!(Timestamp::new(1, 5).is_newer_than(&Timestamp::new(1, 4)));
    }

    #[test]
    fn equal_timestamps_are_not_newer() {
        let ts = Timestamp::new(3, 7);
        let value = Timestamped::new("x", ts);

        assert!(!value.is_newer_than(&ts));
        assert!(!value.is_newer(&Timestamped::new("y", ts)));
    }

    proptest! {
        #[test]
        fn newer_is_a_strict_order(a in any::<(u64, u64)>(), b in any::<(u64, u64)>()) {
            let ta = Timestamp::new(a.0, a.1);
            let tb = Timestamp::new(b.0, b.1);
            prop_assert!(!(ta.is_newer_than(&tb) && tb.is_newer_than(&ta)));
            prop_assert_eq!(ta == tb, !ta.is_newer_than(&tb) && !tb.is_newer_than(&ta));
        }
    }
}
