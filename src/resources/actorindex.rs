use bevy_ecs::prelude::{Entity, Resource};
use rustc_hash::FxHashMap;

use crate::components::actor::ActorId;

/// Lookup from stable [`ActorId`]s to live entities, plus the id counter.
#[derive(Resource, Debug, Default)]
pub struct ActorIndex {
    by_id: FxHashMap<ActorId, Entity>,
    next: u64,
}

impl ActorIndex {
    /// Hand out the next id in spawn order.
    pub fn allocate(&mut self) -> ActorId {
        self.next += 1;
        ActorId(self.next)
    }

    pub fn insert(&mut self, id: ActorId, entity: Entity) {
        self.by_id.insert(id, entity);
    }

    pub fn remove(&mut self, id: ActorId) -> Option<Entity> {
        self.by_id.remove(&id)
    }

    pub fn get(&self, id: ActorId) -> Option<Entity> {
        self.by_id.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
