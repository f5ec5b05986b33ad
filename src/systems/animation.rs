//! Animation systems.
//!
//! - [`animation`] advances every actor's [`Animator`] by the scaled tick
//!   length, asks the host to show frames as they change and writes an
//!   [`AnimationFinished`] message for each playback that ran out.
//! - [`dispatch_finished`] drains those messages and runs the completion
//!   handlers, actors in spawn order.
//!
//! # Related
//!
//! - [`crate::components::animation::Animator`] – per-actor sequences and playback
//! - [`crate::scripting::Api::play_animation_then`] – registers completion handlers

use bevy_ecs::message::Messages;
use bevy_ecs::prelude::*;

use crate::components::actor::ActorId;
use crate::components::animation::Animator;
use crate::events::animation::AnimationFinished;
use crate::events::host::HostCmd;
use crate::resources::hostlink::HostLink;
use crate::resources::worldtime::WorldTime;
use crate::scripting::ScriptHost;

/// Advance playback and report frame changes and completions.
pub fn animation(
    mut query: Query<(Entity, &mut Animator)>,
    time: Res<WorldTime>,
    link: Res<HostLink>,
    mut finished: MessageWriter<AnimationFinished>,
) {
    for (actor, mut animator) in query.iter_mut() {
        if !animator.is_animating() {
            continue;
        }
        let step = animator.advance(time.delta_ms);
        if let Some(frame) = step.shown {
            link.send(HostCmd::ShowFrame { actor, frame });
        }
        if let Some(ticket) = step.completed {
            finished.write(AnimationFinished { actor, ticket });
        }
    }
}

/// Hand this tick's completions to the actors' scripts.
pub fn dispatch_finished(world: &mut World, host: &mut ScriptHost) {
    let drained: Vec<AnimationFinished> = world
        .resource_mut::<Messages<AnimationFinished>>()
        .drain()
        .collect();
    let mut batch: Vec<(ActorId, AnimationFinished)> = drained
        .into_iter()
        .filter_map(|msg| world.get::<ActorId>(msg.actor).map(|id| (*id, msg)))
        .collect();
    batch.sort_by_key(|(id, _)| *id);

    for (_, msg) in batch {
        host.animation_finished(world, msg.actor, msg.ticket);
    }
}
