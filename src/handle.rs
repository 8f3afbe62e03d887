//! Stable identifiers for sessions living in the reactor's handle table.
//!
//! A session gets a `SessionId` — a slab index plus a generation counter —
//! and the notify pipe only ever carries that small `Copy` value, never a
//! pointer or reference. A stale id (one whose slot was freed and reused) is
//! detectable because the generation no longer matches, so it can never
//! alias a different, live session.

use slab::Slab;

/// A stable reference to a session's slot. Never aliases a live session
/// other than the one it was issued for, even after the slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId {
    index: usize,
    generation: u64,
}

impl SessionId {
    /// Decomposes into its raw parts, e.g. for wire encoding in the notify
    /// pipe. Not for constructing ids outside of a `SessionTable` except to
    /// round-trip one that was already issued.
    pub fn raw_parts(self) -> (usize, u64) {
        (self.index, self.generation)
    }

    pub fn from_raw_parts(index: usize, generation: u64) -> Self {
        Self { index, generation }
    }
}

struct Slot<S> {
    session: S,
    generation: u64,
}

/// Owns every live session, keyed by `SessionId`.
pub struct SessionTable<S> {
    slots: Slab<Slot<S>>,
    next_generation: u64,
}

impl<S> Default for SessionTable<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> SessionTable<S> {
    pub fn new() -> Self {
        Self {
            slots: Slab::new(),
            next_generation: 0,
        }
    }

    /// Inserts a session and returns the id it will be known by until
    /// removed.
    pub fn insert(&mut self, session: S) -> SessionId {
        let generation = self.next_generation;
        self.next_generation += 1;
        let index = self.slots.insert(Slot { session, generation });
        SessionId { index, generation }
    }

    pub fn get(&self, id: SessionId) -> Option<&S> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .map(|slot| &slot.session)
    }

    pub fn get_mut(&mut self, id: SessionId) -> Option<&mut S> {
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .map(|slot| &mut slot.session)
    }

    /// Removes the session if `id`'s generation still matches the slot's.
    /// Returns `None` for a stale id, exactly as if the session were
    /// already gone.
    pub fn remove(&mut self, id: SessionId) -> Option<S> {
        if self.slots.get(id.index).map(|s| s.generation) != Some(id.generation) {
            return None;
        }
        Some(self.slots.remove(id.index).session)
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.slots
            .get(id.index)
            .is_some_and(|slot| slot.generation == id.generation)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_get_round_trips() {
        let mut table = SessionTable::new();
        let id = table.insert("hello");
        assert_eq!(table.get(id), Some(&"hello"));
    }

    #[test]
    fn stale_id_after_reuse_does_not_alias() {
        let mut table: SessionTable<&str> = SessionTable::new();
        let first = table.insert("first");
        table.remove(first).unwrap();
        let second = table.insert("second");
        assert_eq!(first.index, second.index);
        assert_ne!(first.generation, second.generation);
        assert_eq!(table.get(first), None);
        assert_eq!(table.get(second), Some(&"second"));
    }

    #[test]
    fn remove_returns_none_for_stale_id() {
        let mut table: SessionTable<&str> = SessionTable::new();
        let id = table.insert("only");
        table.remove(id).unwrap();
        assert_eq!(table.remove(id), None);
    }
}
