//! Minimal entity table consumed by the packet apply path.
//!
//! Stands in for the engine's entity world: just enough to resolve a subject
//! id from a snapshot and to reject decoding into non-player entities.

use crate::store::EntityId;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Player,
    Npc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
}

impl Entity {
    pub fn player(id: EntityId) -> Self {
        Self {
            id,
            kind: EntityKind::Player,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn is_player_like(&self) -> bool {
        self.kind == EntityKind::Player
    }
}

#[derive(Debug, Default)]
pub struct World {
    entities: HashMap<EntityId, Entity>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entity: Entity) {
        self.entities.insert(entity.id, entity);
    }

    pub fn remove(&mut self, id: EntityId) {
        self.entities.remove(&id);
    }

    pub fn entity_by_id(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_and_player_check() {
        let mut world = World::new();
        world.insert(Entity::player(1));
        world.insert(Entity {
            id: 2,
            kind: EntityKind::Npc,
        });

        assert!(world.entity_by_id(1).unwrap().is_player_like());
        assert!(!world.entity_by_id(2).unwrap().is_player_like());
        assert!(world.entity_by_id(3).is_none());

        world.remove(1);
        assert!(world.entity_by_id(1).is_none());
    }
}
