//! Kinematic body component.
//!
//! The [`RigidBody`] stores an actor's velocity together with the flags the
//! physics and collision stages read. Velocity is authoritative: there is no
//! mass or force accumulation, scripts set it directly and the movement
//! system only adds gravity.
//!
//! The `frozen` flag suspends integration while leaving velocity untouched,
//! useful when a script takes over an actor's position (e.g. while a warp
//! door animates the player through it).

use bevy_ecs::prelude::Component;

use crate::geometry::Vec2;

/// Velocity and physics flags of an actor.
///
/// # Fields
/// - `velocity` - pixels per tick, positive `y` is downward
/// - `mobile` - only mobile actors move or get pushed by solids
/// - `gravity` - apply gravity while not grounded
/// - `frozen` - skip integration for this actor
/// - `grounded` - written by collision resolution, read on the next tick
/// - `wet` - submerged in liquid; scripts decide what it means
/// - `noclip` - excluded from collision detection entirely
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct RigidBody {
    pub velocity: Vec2,
    pub mobile: bool,
    pub gravity: bool,
    pub frozen: bool,
    pub grounded: bool,
    pub wet: bool,
    pub noclip: bool,
}

impl RigidBody {
    /// A mobile body, optionally affected by gravity.
    pub fn mobile(gravity: bool) -> Self {
        Self {
            mobile: true,
            gravity,
            ..Self::default()
        }
    }

    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    /// Whether the movement system integrates this body.
    pub fn integrates(&self) -> bool {
        self.mobile && !self.frozen
    }
}
