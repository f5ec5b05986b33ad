//! Collision event types handed to actor scripts.
//!
//! The collision resolver builds one [`CollideEvent`] per receiving actor and
//! contact pair each tick, and a [`LeaveEvent`] when a pair stops touching.
//! `OnCollide` handlers answer with a [`Verdict`] that decides whether the
//! receiver blocks the other actor.

use bevy_ecs::prelude::Entity;

use crate::components::actor::ActorId;
use crate::geometry::Rect;

/// Sent to the receiving actor while another actor touches it.
#[derive(Debug, Clone, Copy)]
pub struct CollideEvent {
    /// The other actor (usually the one moving into the receiver).
    pub actor: Entity,
    /// Shared area in the receiver's local frame. Zero height or width for
    /// actors resting edge to edge.
    pub overlap: Rect,
    /// Whether the overlap touches the receiver's hitbox, not just its
    /// sprite bounds.
    pub in_hitbox: bool,
    /// Whether the other actor has stopped moving into the receiver.
    pub settled: bool,
}

/// Sent once when an actor that touched the receiver last tick no longer does.
#[derive(Debug, Clone, Copy)]
pub struct LeaveEvent {
    pub actor: Entity,
    /// Kept so the event stays meaningful when `actor` was destroyed.
    pub id: ActorId,
}

/// Answer of an `OnCollide` handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verdict {
    /// Block the other actor.
    Solid,
    /// Let the other actor pass through.
    NotSolid,
    /// No opinion; treated as solid unless another handler says otherwise.
    #[default]
    Unspecified,
}

impl Verdict {
    /// Effective decision once all handlers ran.
    pub fn is_solid(self) -> bool {
        self != Verdict::NotSolid
    }

    /// Combine with a later handler's verdict: the first explicit one wins.
    pub fn or(self, later: Verdict) -> Verdict {
        match self {
            Verdict::Unspecified => later,
            explicit => explicit,
        }
    }
}

impl From<bool> for Verdict {
    /// `true` means solid.
    fn from(solid: bool) -> Self {
        if solid {
            Verdict::Solid
        } else {
            Verdict::NotSolid
        }
    }
}
