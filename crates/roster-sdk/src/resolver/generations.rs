//! Per-slot generation tickets
//!
//! Every resolution started for a slot gets a fresh ticket. Only the holder
//! of the latest ticket may apply its result; anything older is stale.

use std::collections::HashMap;
use std::hash::Hash;

/// Proof that a resolution was started, compared against the slot's latest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

impl Ticket {
    pub fn generation(&self) -> u64 {
        self.0
    }
}

/// Latest ticket per slot
#[derive(Debug)]
pub struct Generations<K> {
    current: HashMap<K, u64>,
    next: u64,
}

impl<K: Hash + Eq> Generations<K> {
    pub fn new() -> Self {
        Self {
            current: HashMap::new(),
            next: 0,
        }
    }

    /// Start a resolution for `key`, superseding any in flight
    pub fn begin(&mut self, key: K) -> Ticket {
        self.next += 1;
        self.current.insert(key, self.next);
        Ticket(self.next)
    }

    pub fn is_current(&self, key: &K, ticket: Ticket) -> bool {
        self.current.get(key) == Some(&ticket.0)
    }

    /// Complete a resolution. Returns false if the ticket is stale, in which
    /// case the result must be dropped.
    pub fn finish(&mut self, key: &K, ticket: Ticket) -> bool {
        if self.is_current(key, ticket) {
            self.current.remove(key);
            true
        } else {
            false
        }
    }

    /// Drop tickets for which `keep` returns false; their results become stale
    pub fn retain(&mut self, mut keep: impl FnMut(&K) -> bool) {
        self.current.retain(|key, _| keep(key));
    }

    /// Invalidate every outstanding ticket
    pub fn clear(&mut self) {
        self.current.clear();
    }

    /// Number of resolutions still in flight
    pub fn in_flight(&self) -> usize {
        self.current.len()
    }
}

impl<K: Hash + Eq> Default for Generations<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_ticket_wins() {
        let mut gens = Generations::new();
        let first = gens.begin("slot");
        let second = gens.begin("slot");

        assert!(!gens.finish(&"slot", first));
        assert!(gens.finish(&"slot", second));
        assert_eq!(gens.in_flight(), 0);
    }

    #[test]
    fn test_finish_is_single_use() {
        let mut gens = Generations::new();
        let ticket = gens.begin(1u32);

        assert!(gens.finish(&1, ticket));
        assert!(!gens.finish(&1, ticket));
    }

    #[test]
    fn test_slots_are_independent() {
        let mut gens = Generations::new();
        let a = gens.begin("a");
        let b = gens.begin("b");
        gens.begin("a");

        assert!(gens.finish(&"b", b));
        assert!(!gens.is_current(&"a", a));
    }

    #[test]
    fn test_clear_makes_everything_stale() {
        let mut gens = Generations::new();
        let ticket = gens.begin("a");
        gens.clear();
        assert!(!gens.finish(&"a", ticket));
    }
}
