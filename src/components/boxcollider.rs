use bevy_ecs::prelude::Component;

use crate::error::SimError;
use crate::geometry::{Point, Rect, Vec2};

/// Sprite bounds and hitbox of an actor, both relative to its position.
///
/// The bounding box (`size`) decides which actors are considered for
/// collision at all; the hitbox is the solid part. A zero hitbox stands for
/// the whole sprite.
#[derive(Debug, Clone, Copy, PartialEq, Component)]
pub struct BoxCollider {
    pub size: Vec2,
    pub hitbox: Rect,
}

impl BoxCollider {
    /// Collider whose hitbox covers the whole sprite.
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            size: Vec2::new(width.max(0.0), height.max(0.0)),
            hitbox: Rect::zero(),
        }
    }

    /// Replace the hitbox, rejecting negative sizes.
    pub fn with_hitbox(mut self, hitbox: Rect) -> Result<Self, SimError> {
        self.set_hitbox(hitbox.x, hitbox.y, hitbox.w, hitbox.h)?;
        Ok(self)
    }

    /// Set the hitbox; on error the previous one is kept.
    pub fn set_hitbox(&mut self, x: f32, y: f32, w: f32, h: f32) -> Result<(), SimError> {
        self.hitbox = Rect::new(x, y, w, h).map_err(|_| SimError::InvalidHitbox { w, h })?;
        Ok(())
    }

    /// Hitbox in actor-local space with the zero sentinel resolved.
    pub fn local_hitbox(&self) -> Rect {
        if self.hitbox.is_zero() {
            Rect {
                x: 0.0,
                y: 0.0,
                w: self.size.x,
                h: self.size.y,
            }
        } else {
            self.hitbox
        }
    }

    /// Sprite bounding box for an actor at `position`.
    pub fn bounds(&self, position: Vec2) -> Rect {
        Rect {
            x: position.x,
            y: position.y,
            w: self.size.x,
            h: self.size.y,
        }
    }

    /// Hitbox in world space for an actor at `position`.
    pub fn world_hitbox(&self, position: Vec2) -> Rect {
        self.local_hitbox().translated(position)
    }

    /// Point containment against the sprite bounds, in world space.
    pub fn contains_point(&self, position: Vec2, point: Point) -> bool {
        self.bounds(position).contains_point(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_hitbox_falls_back_to_sprite() {
        let c = BoxCollider::new(34.0, 76.0);
        assert_eq!(c.local_hitbox(), Rect::sized(34.0, 76.0).unwrap());
        let world = c.world_hitbox(Vec2::new(10.0, 20.0));
        assert_eq!((world.x, world.y, world.w, world.h), (10.0, 20.0, 34.0, 76.0));
    }

    #[test]
    fn negative_hitbox_is_rejected_and_previous_kept() {
        let mut c = BoxCollider::new(32.0, 32.0);
        c.set_hitbox(4.0, 4.0, 24.0, 28.0).unwrap();
        let err = c.set_hitbox(0.0, 0.0, -3.0, 10.0);
        assert!(matches!(err, Err(SimError::InvalidHitbox { .. })));
        assert_eq!(c.local_hitbox(), Rect::new(4.0, 4.0, 24.0, 28.0).unwrap());
    }
}
