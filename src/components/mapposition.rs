use bevy_ecs::prelude::Component;

use crate::geometry::Vec2;

/// World position of an actor's origin (top-left of its sprite).
///
/// `prev` holds the position at the start of the current tick and is
/// written by the movement system before integration. Collision uses it to
/// tell which side a mover came from and whether it is still moving.
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct MapPosition {
    pub pos: Vec2,
    pub prev: Vec2,
}

impl MapPosition {
    pub fn new(x: f32, y: f32) -> Self {
        let pos = Vec2::new(x, y);
        Self { pos, prev: pos }
    }

    /// Displacement since the start of the tick.
    pub fn delta(&self) -> Vec2 {
        self.pos - self.prev
    }

    /// Move without leaving a displacement behind, as a teleport.
    pub fn teleport(&mut self, to: Vec2) {
        self.pos = to;
        self.prev = to;
    }
}
