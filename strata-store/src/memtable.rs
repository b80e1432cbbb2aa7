//! # Memtable
//!
//! Bounded in-memory map of the most recent event per key since the last
//! flush. Upserts are last-writer-wins by timestamp, with equal timestamps
//! overwriting. The table never orders its entries itself; snapshots sort on
//! the way out.
//!
//! The memtable carries no lock of its own: all access happens under the
//! store's reader/writer lock.

use std::collections::HashMap;

use strata_core::Event;

pub struct Memtable {
    max_items: usize,
    data: HashMap<String, Event>,
}

impl Memtable {
    pub fn new(max_items: usize) -> Self {
        Self {
            max_items,
            data: HashMap::with_capacity(max_items.min(4096)),
        }
    }

    /// Insert or replace the entry for `event.key`. An existing entry is only
    /// replaced when the incoming timestamp is greater or equal.
    pub fn upsert(&mut self, event: Event) {
        match self.data.get(&event.key) {
            Some(current) if event.ts < current.ts => {}
            _ => {
                self.data.insert(event.key.clone(), event);
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Event> {
        self.data.get(key)
    }

    /// Cardinality has reached the flush threshold.
    pub fn full(&self) -> bool {
        self.data.len() >= self.max_items
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// All entries sorted ascending by key, ready for segment writing.
    pub fn snapshot_sorted_by_key(&self) -> Vec<Event> {
        let mut out: Vec<Event> = self.data.values().cloned().collect();
        out.sort_by(|a, b| a.key.cmp(&b.key));
        out
    }

    /// All entries with `from <= ts <= to`, sorted ascending by `(ts, key)`.
    pub fn range_by_ts(&self, from: i64, to: i64) -> Vec<Event> {
        let mut out: Vec<Event> = self
            .data
            .values()
            .filter(|e| e.ts >= from && e.ts <= to)
            .cloned()
            .collect();
        sort_by_ts(&mut out);
        out
    }
}

/// Sort events ascending by timestamp, ties broken by key ascending.
pub fn sort_by_ts(events: &mut [Event]) {
    events.sort_by(|a, b| a.ts.cmp(&b.ts).then_with(|| a.key.cmp(&b.key)));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(key: &str, ts: i64, value: &str) -> Event {
        Event::new(key, ts, value.as_bytes().to_vec())
    }

    #[test]
    fn test_upsert_keeps_highest_ts() {
        let mut mem = Memtable::new(10);
        mem.upsert(event("a", 5, "x"));
        mem.upsert(event("a", 3, "y")); // older, ignored
        assert_eq!(mem.get("a").unwrap().value.as_ref(), b"x");

        mem.upsert(event("a", 5, "z")); // tie, overwrites
        assert_eq!(mem.get("a").unwrap().value.as_ref(), b"z");

        mem.upsert(event("a", 7, "w"));
        assert_eq!(mem.get("a").unwrap().ts, 7);
        assert_eq!(mem.len(), 1);
    }

    #[test]
    fn test_full_and_clear() {
        let mut mem = Memtable::new(2);
        assert!(!mem.full());
        mem.upsert(event("a", 1, "x"));
        mem.upsert(event("b", 2, "y"));
        assert!(mem.full());

        // Upserting an existing key does not grow cardinality.
        mem.upsert(event("b", 3, "z"));
        assert_eq!(mem.len(), 2);

        mem.clear();
        assert!(mem.is_empty());
        assert!(!mem.full());
    }

    #[test]
    fn test_snapshot_sorted_by_key() {
        let mut mem = Memtable::new(10);
        mem.upsert(event("c", 3, "3"));
        mem.upsert(event("a", 1, "1"));
        mem.upsert(event("b", 2, "2"));

        let snapshot = mem.snapshot_sorted_by_key();
        let keys: Vec<&str> = snapshot.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_range_by_ts_inclusive_and_ordered() {
        let mut mem = Memtable::new(10);
        mem.upsert(event("d", 40, "D"));
        mem.upsert(event("b", 20, "B"));
        mem.upsert(event("c", 30, "C"));
        mem.upsert(event("a", 10, "A"));
        // Same ts as "b": key breaks the tie.
        mem.upsert(event("bb", 20, "BB"));

        let hits = mem.range_by_ts(20, 30);
        let keys: Vec<&str> = hits.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["b", "bb", "c"]);
    }

    #[test]
    fn test_range_by_ts_negative_timestamps() {
        let mut mem = Memtable::new(10);
        mem.upsert(event("a", -10, "A"));
        mem.upsert(event("b", 5, "B"));

        let hits = mem.range_by_ts(-20, 0);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].key, "a");
    }
}
