use bevy_ecs::message::Message;
use bevy_ecs::prelude::Entity;

/// A playback ran through its last frame.
///
/// Written by the animation system and consumed by the level, which hands
/// it to the actor's script. `ticket` identifies the playback, so a
/// completion handler only runs for the playback it was registered with.
#[derive(Message, Debug, Clone, Copy)]
pub struct AnimationFinished {
    pub actor: Entity,
    pub ticket: u64,
}
