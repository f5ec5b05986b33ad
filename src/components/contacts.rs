use bevy_ecs::prelude::{Component, Entity};
use rustc_hash::FxHashMap;

use super::actor::ActorId;

/// Actors whose bounding boxes were in contact with this one at the end of
/// the previous collision pass. Used to detect leave transitions.
#[derive(Component, Debug, Clone, Default)]
pub struct Contacts {
    pub actors: FxHashMap<Entity, ActorId>,
}
