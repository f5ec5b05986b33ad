//! Script timer dispatch.
//!
//! Timers live in each actor's [`ActorTimers`] component; their callbacks
//! live in the actor's script. Each tick this stage collects the timers that
//! are due, actors in spawn order and each actor's timers by `(due, seq)`,
//! and fires them one by one.
//!
//! Every timer is re-validated right before it fires, since an earlier
//! callback in the same tick may have cancelled it, rescheduled it or
//! destroyed its actor. Timers created during this stage wait for the next
//! tick.

use bevy_ecs::prelude::*;

use crate::components::actor::ActorId;
use crate::components::timer::{ActorTimers, TimerId};
use crate::resources::simconfig::SimConfig;
use crate::resources::worldtime::WorldTime;
use crate::scripting::ScriptHost;

pub fn fire_due_timers(world: &mut World, host: &mut ScriptHost) {
    let now = world.resource::<WorldTime>().elapsed_ms;
    let tick_ms = f64::from(world.resource::<SimConfig>().tick_ms());

    let mut query = world.query::<(Entity, &ActorId, &ActorTimers)>();
    let mut batch: Vec<(ActorId, Entity, Vec<(TimerId, f64)>)> = query
        .iter(world)
        .filter(|(_, _, timers)| !timers.is_empty())
        .map(|(entity, id, timers)| (*id, entity, timers.due(now)))
        .filter(|(_, _, due)| !due.is_empty())
        .collect();
    batch.sort_by_key(|(id, _, _)| *id);

    for (_, actor, due) in batch {
        for (timer, due_ms) in due {
            if host.is_faulted(actor) {
                break;
            }
            let Some(mut timers) = world.get_mut::<ActorTimers>(actor) else {
                // destroyed earlier this tick
                break;
            };
            if !timers.fire(timer, due_ms, tick_ms) {
                continue;
            }
            host.fire_timer(world, actor, timer);
        }
    }
}
