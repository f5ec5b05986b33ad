//! Input dispatch.
//!
//! The host reports held buttons through
//! [`Level::set_input`](crate::level::Level::set_input); this stage hands the
//! resulting [`InputState`] to scripts:
//!
//! - `OnKeypress` runs every tick for each player-controlled actor
//! - `OnUse` runs on the tick "use" goes down, for every actor whose hitbox
//!   touches a player's bounding box
//!
//! Players are visited in spawn order, and so are the actors they use.
use bevy_ecs::prelude::*;

use crate::components::actor::{ActorFlags, ActorId};
use crate::components::boxcollider::BoxCollider;
use crate::components::mapposition::MapPosition;
use crate::events::input::{KeypressEvent, UseEvent};
use crate::geometry::Rect;
use crate::resources::input::InputState;
use crate::scripting::{HandlerKind, ScriptHost};
use crate::systems::collision::CONTACT_SLOP;

fn players(world: &mut World) -> Vec<Entity> {
    let mut query = world.query::<(Entity, &ActorId, &ActorFlags)>();
    let mut found: Vec<(ActorId, Entity)> = query
        .iter(world)
        .filter(|(_, _, flags)| flags.is_player)
        .map(|(entity, id, _)| (*id, entity))
        .collect();
    found.sort_by_key(|(id, _)| *id);
    found.into_iter().map(|(_, entity)| entity).collect()
}

/// Run keypress and use handlers for this tick's input.
pub fn dispatch_input(world: &mut World, host: &mut ScriptHost) {
    let input = *world.resource::<InputState>();
    let players = players(world);

    let ev = KeypressEvent { input };
    for &player in &players {
        if host.handles(player, HandlerKind::Keypress) {
            host.keypress(world, player, &ev);
        }
    }

    if !input.use_action.just_pressed {
        return;
    }
    for player in players {
        // A keypress handler may have moved or removed the player.
        let Some(reach) = bounds_of(world, player) else {
            continue;
        };
        let mut query = world.query::<(Entity, &ActorId, &MapPosition, &BoxCollider)>();
        let mut targets: Vec<(ActorId, Entity)> = query
            .iter(world)
            .filter(|(entity, _, _, _)| *entity != player)
            .filter(|(_, _, position, collider)| {
                collider
                    .world_hitbox(position.pos)
                    .inflated(CONTACT_SLOP)
                    .contact(&reach)
                    .is_some()
            })
            .map(|(entity, id, _, _)| (*id, entity))
            .collect();
        targets.sort_by_key(|(id, _)| *id);

        let ev = UseEvent { actor: player };
        for (_, target) in targets {
            if host.handles(target, HandlerKind::Use) {
                host.used(world, target, &ev);
            }
        }
    }
}

fn bounds_of(world: &World, actor: Entity) -> Option<Rect> {
    let position = world.get::<MapPosition>(actor)?;
    let collider = world.get::<BoxCollider>(actor)?;
    Some(collider.bounds(position.pos))
}
