use bevy_ecs::prelude::Entity;

use crate::resources::input::InputState;

/// Sent to a player-controlled actor every tick with the current input.
#[derive(Debug, Clone, Copy)]
pub struct KeypressEvent {
    pub input: InputState,
}

/// Sent to an actor when the player presses "use" while touching it.
#[derive(Debug, Clone, Copy)]
pub struct UseEvent {
    /// The actor doing the using.
    pub actor: Entity,
}
