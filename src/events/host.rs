//! Commands sent from the simulation to the embedding host.

use bevy_ecs::prelude::Entity;

use crate::components::animation::FrameId;
use crate::geometry::Point;

/// Requests for collaborators outside the simulation core.
///
/// Delivered through [`HostLink`](crate::resources::hostlink::HostLink) in the
/// order they were issued.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCmd {
    /// Show a sprite frame/layer for an actor.
    ShowFrame { actor: Entity, frame: FrameId },
    SetVisible { actor: Entity, visible: bool },
    PlaySound { name: String },
    /// Display a short message to the player.
    Flash { message: String },
    SetCheckpoint { position: Point },
    EndLevel,
    FailLevel { reason: String },
    /// Reset the level's elapsed-time counter.
    ResetTimer,
    /// An actor was removed from the level.
    Despawned { actor: Entity },
}
