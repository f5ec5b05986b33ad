//! Collision resolution.
//!
//! Runs after movement. Every pair of actors whose sprite bounds touch is
//! visited once, in spawn order, and each side that registered `OnCollide`
//! handlers is asked for a [`Verdict`] about the other:
//!
//! - not solid: the other actor passes through
//! - solid (or no opinion): a mobile mover is snapped out of the receiver's
//!   hitbox along the axis it came in on, and landing on top grounds it
//!
//! Actors without `OnCollide` handlers never block anything. Each actor's
//! [`Contacts`] keep last tick's touching set so `OnLeave` fires exactly
//! once when a pair stops touching, even if the other actor was destroyed.
//!
//! When an actor touches several solids in one tick each pair is resolved
//! on its own, in spawn order; there is no global constraint solve.

use bevy_ecs::prelude::*;
use log::debug;
use rustc_hash::FxHashMap;

use crate::components::actor::ActorId;
use crate::components::boxcollider::BoxCollider;
use crate::components::contacts::Contacts;
use crate::components::mapposition::MapPosition;
use crate::components::rigidbody::RigidBody;
use crate::events::collision::{CollideEvent, LeaveEvent};
use crate::geometry::{Axis, Rect, Vec2};
use crate::resources::simconfig::SimConfig;
use crate::scripting::{HandlerKind, ScriptHost};

/// Gaps up to this size still count as touching, so actors resting on each
/// other stay in contact despite float rounding.
pub const CONTACT_SLOP: f32 = 1e-3;

/// What the resolver needs to know about one actor.
#[derive(Debug, Clone, Copy)]
struct Shape {
    pos: Vec2,
    prev: Vec2,
    bounds: Rect,
    /// Local hitbox, zero sentinel resolved.
    local: Rect,
    hitbox: Rect,
    prev_hitbox: Rect,
    velocity: Vec2,
    mobile: bool,
    noclip: bool,
}

impl Shape {
    fn read(world: &World, entity: Entity) -> Option<Self> {
        let position = world.get::<MapPosition>(entity)?;
        let collider = world.get::<BoxCollider>(entity)?;
        let body = world.get::<RigidBody>(entity)?;
        let local = collider.local_hitbox();
        Some(Shape {
            pos: position.pos,
            prev: position.prev,
            bounds: collider.bounds(position.pos),
            local,
            hitbox: local.translated(position.pos),
            prev_hitbox: local.translated(position.prev),
            velocity: body.velocity,
            mobile: body.mobile,
            noclip: body.noclip,
        })
    }

    fn touches(&self, other: &Shape) -> bool {
        self.bounds
            .inflated(CONTACT_SLOP)
            .contact(&other.bounds)
            .is_some()
    }
}

/// Axis the mover entered the receiver's hitbox on: the one on which it was
/// still apart last tick, or the shallower one if that is ambiguous.
fn resolution_axis(mover: &Shape, receiver: &Shape) -> Axis {
    let was_apart =
        |axis| mover.prev_hitbox.penetration(&receiver.hitbox, axis) <= CONTACT_SLOP;
    match (was_apart(Axis::Horizontal), was_apart(Axis::Vertical)) {
        (true, false) => Axis::Horizontal,
        (false, true) => Axis::Vertical,
        _ => {
            let pen_h = mover.hitbox.penetration(&receiver.hitbox, Axis::Horizontal);
            let pen_v = mover.hitbox.penetration(&receiver.hitbox, Axis::Vertical);
            if pen_v <= pen_h {
                Axis::Vertical
            } else {
                Axis::Horizontal
            }
        }
    }
}

/// Run one collision pass: verdicts, pushes, grounding and leave events.
pub fn resolve_collisions(world: &mut World, host: &mut ScriptHost) {
    let settle_epsilon = world.resource::<SimConfig>().settle_epsilon;

    // Grounded is recomputed from scratch every tick.
    let mut bodies = world.query::<&mut RigidBody>();
    for mut body in bodies.iter_mut(world) {
        if body.mobile && body.grounded {
            body.grounded = false;
        }
    }

    let mut query = world.query::<(Entity, &ActorId, &RigidBody)>();
    let mut actors: Vec<(ActorId, Entity)> = query
        .iter(world)
        .filter(|(_, _, body)| !body.noclip)
        .map(|(entity, id, _)| (*id, entity))
        .collect();
    actors.sort_by_key(|(id, _)| *id);

    let mut touching: FxHashMap<Entity, FxHashMap<Entity, ActorId>> = FxHashMap::default();
    for i in 0..actors.len() {
        for j in (i + 1)..actors.len() {
            let (id_a, a) = actors[i];
            let (id_b, b) = actors[j];
            // Either side may have been destroyed or changed by a handler
            // earlier in this pass.
            let (Some(shape_a), Some(shape_b)) = (Shape::read(world, a), Shape::read(world, b))
            else {
                continue;
            };
            if shape_a.noclip || shape_b.noclip || !shape_a.touches(&shape_b) {
                continue;
            }
            touching.entry(a).or_default().insert(b, id_b);
            touching.entry(b).or_default().insert(a, id_a);
            collide(world, host, a, b, settle_epsilon);
            collide(world, host, b, a, settle_epsilon);
        }
    }

    dispatch_leaves(world, host, touching);
}

/// Ask `receiver` about `mover` and apply a solid verdict.
fn collide(world: &mut World, host: &mut ScriptHost, receiver: Entity, mover: Entity, epsilon: f32) {
    if !host.handles(receiver, HandlerKind::Collide) {
        return;
    }
    let (Some(r), Some(m)) = (Shape::read(world, receiver), Shape::read(world, mover)) else {
        return;
    };
    if !r.touches(&m) {
        return;
    }
    let overlap = r.bounds.clip(&m.bounds);
    let axis = resolution_axis(&m, &r);
    let ev = CollideEvent {
        actor: mover,
        overlap: overlap.translated(-r.pos),
        in_hitbox: r.hitbox.inflated(CONTACT_SLOP).contact(&overlap).is_some(),
        settled: (m.pos - m.prev).along(axis).abs() < epsilon,
    };
    if host.collide(world, receiver, &ev).is_solid() {
        push_out(world, receiver, mover, axis);
    }
}

/// Snap a mobile `mover` to the edge of `receiver`'s hitbox along `axis`.
fn push_out(world: &mut World, receiver: Entity, mover: Entity, axis: Axis) {
    // Re-read: the handler may have moved or destroyed either actor.
    let (Some(r), Some(m)) = (Shape::read(world, receiver), Shape::read(world, mover)) else {
        return;
    };
    if !m.mobile {
        return;
    }
    let pen_h = m.hitbox.penetration(&r.hitbox, Axis::Horizontal);
    let pen_v = m.hitbox.penetration(&r.hitbox, Axis::Vertical);
    if pen_h < -CONTACT_SLOP || pen_v < -CONTACT_SLOP {
        return;
    }

    let mut pos = m.pos;
    let mut velocity = m.velocity;
    let mut grounded = false;
    match axis {
        Axis::Vertical => {
            if pen_h <= 0.0 {
                return;
            }
            if m.hitbox.center().y <= r.hitbox.center().y {
                pos.y = pos.y.min(r.hitbox.y - m.local.bottom());
                velocity.y = velocity.y.min(0.0);
                grounded = true;
            } else {
                pos.y = pos.y.max(r.hitbox.bottom() - m.local.y);
                velocity.y = velocity.y.max(0.0);
            }
        }
        Axis::Horizontal => {
            if pen_v <= 0.0 {
                return;
            }
            if m.hitbox.center().x <= r.hitbox.center().x {
                pos.x = pos.x.min(r.hitbox.x - m.local.right());
                velocity.x = velocity.x.min(0.0);
            } else {
                pos.x = pos.x.max(r.hitbox.right() - m.local.x);
                velocity.x = velocity.x.max(0.0);
            }
        }
    }

    if pos != m.pos {
        debug!(
            target: "collision",
            "pushed {:?} out of {:?} along {:?}: {:?} -> {:?}",
            mover, receiver, axis, m.pos, pos
        );
    }
    if let Some(mut position) = world.get_mut::<MapPosition>(mover) {
        position.pos = pos;
    }
    if let Some(mut body) = world.get_mut::<RigidBody>(mover) {
        body.velocity = velocity;
        body.grounded |= grounded;
    }
}

/// Store this tick's contacts and fire `OnLeave` for pairs that separated.
fn dispatch_leaves(
    world: &mut World,
    host: &mut ScriptHost,
    mut touching: FxHashMap<Entity, FxHashMap<Entity, ActorId>>,
) {
    let mut query = world.query::<(Entity, &ActorId, &Contacts)>();
    let mut previous: Vec<(ActorId, Entity, Vec<(ActorId, Entity)>)> = query
        .iter(world)
        .map(|(entity, id, contacts)| {
            let before = contacts.actors.iter().map(|(e, id)| (*id, *e)).collect();
            (*id, entity, before)
        })
        .collect();
    previous.sort_by_key(|(id, _, _)| *id);

    for (_, actor, before) in previous {
        let now = touching.remove(&actor).unwrap_or_default();
        let mut left: Vec<(ActorId, Entity)> = before
            .into_iter()
            .filter(|(_, other)| !now.contains_key(other))
            .collect();
        left.sort_by_key(|(id, _)| *id);

        let Some(mut contacts) = world.get_mut::<Contacts>(actor) else {
            continue;
        };
        contacts.actors = now;

        for (id, other) in left {
            if !host.handles(actor, HandlerKind::Leave) {
                break;
            }
            host.leave(world, actor, &LeaveEvent { actor: other, id });
        }
    }
}
