//! Entity-to-record association with lazy default construction.
//!
//! The store is an explicit side-table from stable entity ids to owned
//! records, gated by an opt-in set: only attached entities (players) ever get
//! a record. Records are created lazily on first lookup and live exactly as
//! long as the attachment. The store itself never touches the network.

use crate::stat::StatRecord;
use std::collections::{HashMap, HashSet};

/// Stable entity identifier as used on the wire.
pub type EntityId = i32;

#[derive(Debug, Default)]
pub struct StatStore {
    attached: HashSet<EntityId>,
    records: HashMap<EntityId, StatRecord>,
}

impl StatStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opts an entity into the system. Idempotent.
    pub fn attach(&mut self, entity: EntityId) {
        self.attached.insert(entity);
    }

    /// Removes the entity's attachment and drops its record.
    pub fn detach(&mut self, entity: EntityId) {
        self.attached.remove(&entity);
        self.records.remove(&entity);
    }

    pub fn is_attached(&self, entity: EntityId) -> bool {
        self.attached.contains(&entity)
    }

    /// Returns the entity's record, creating the default lazily on first
    /// lookup. `None` when the entity has not opted in; lookups of
    /// non-attached entities never insert anything.
    pub fn fetch(&mut self, entity: EntityId) -> Option<&StatRecord> {
        if !self.attached.contains(&entity) {
            return None;
        }
        Some(self.records.entry(entity).or_default())
    }

    /// Runs `f` with exclusive mutable access to the entity's record. This is
    /// the only sanctioned mutation path; callers must not keep a reference
    /// beyond the callback. Returns false (and does nothing) when the entity
    /// has not opted in.
    pub fn with_record(&mut self, entity: EntityId, f: impl FnOnce(&mut StatRecord)) -> bool {
        if !self.attached.contains(&entity) {
            return false;
        }
        f(self.records.entry(entity).or_default());
        true
    }

    /// Overwrites every field of the entity's record with another record's
    /// serialized form. Routed through serialize/deserialize so that future
    /// field additions stay correct without touching this call site.
    pub fn replace_all(&mut self, entity: EntityId, new_record: &StatRecord) -> bool {
        let map = new_record.serialize();
        self.with_record(entity, |record| record.deserialize(&map))
    }

    /// Attached entities in no particular order.
    pub fn attached_entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.attached.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stat::EMPTY;

    #[test]
    fn test_fetch_requires_attachment() {
        let mut store = StatStore::new();
        assert!(store.fetch(1).is_none());
        store.attach(1);
        assert_eq!(store.fetch(1).unwrap().race(), EMPTY);
        assert!(store.fetch(2).is_none());
    }

    #[test]
    fn test_lazy_default_on_first_lookup() {
        let mut store = StatStore::new();
        store.attach(1);
        let record = store.fetch(1).unwrap();
        assert_eq!(record.strength(), 5);
        assert_eq!(record.alignment(), 100);
    }

    #[test]
    fn test_with_record_mutates_in_place() {
        let mut store = StatStore::new();
        store.attach(1);
        assert!(store.with_record(1, |r| r.set_energy(42)));
        assert_eq!(store.fetch(1).unwrap().energy(), 42);
    }

    #[test]
    fn test_with_record_is_a_noop_when_absent() {
        let mut store = StatStore::new();
        assert!(!store.with_record(1, |r| r.set_energy(42)));
        assert!(store.fetch(1).is_none());
    }

    #[test]
    fn test_replace_all_overwrites_every_field() {
        let mut store = StatStore::new();
        store.attach(1);
        store.with_record(1, |r| r.set_energy(42));

        let incoming = StatRecord::new("saiyan", "base", 9, 9, 9, 9, 9, 9, -10, true, false);
        assert!(store.replace_all(1, &incoming));
        assert_eq!(store.fetch(1).unwrap(), &incoming);
    }

    #[test]
    fn test_detach_drops_the_record() {
        let mut store = StatStore::new();
        store.attach(1);
        store.with_record(1, |r| r.set_strength(50));
        store.detach(1);
        assert!(store.fetch(1).is_none());

        // Re-attaching starts over from the defaults.
        store.attach(1);
        assert_eq!(store.fetch(1).unwrap().strength(), 5);
    }
}
