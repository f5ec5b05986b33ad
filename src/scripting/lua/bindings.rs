//! Operations behind the `__host` bridge.
//!
//! `prelude.lua` calls `__host(op, actor_id, ...)`; [`dispatch`] maps the op
//! name onto the running actor's [`Api`]. Actor-scoped ops act on
//! `actor_id` (the running actor when `nil`), the rest ignore it.
//! Plain values go back to Lua as multiple returns and the prelude wraps
//! them into vectors and actor tables.

use bevy_ecs::prelude::*;
use log::debug;
use mlua::prelude::*;

use crate::components::actor::ActorId;
use crate::components::animation::FrameId;
use crate::components::timer::TimerId;
use crate::events::collision::{CollideEvent, Verdict};
use crate::events::input::KeypressEvent;
use crate::geometry::Vec2;
use crate::resources::actorindex::ActorIndex;
use crate::resources::input::BoolState;
use crate::resources::messagebus::SubscriptionId;
use crate::scripting::api::Api;
use crate::scripting::payload::Payload;

use super::LuaDoodad;

/// Registry key of the prelude's actor table constructor.
pub(super) const ACTOR_CTOR: &str = "doodad.actor";

type LuaApi<'a> = Api<'a, LuaDoodad>;

/// A message payload on its way into or out of Lua. Actors travel as ids
/// since the entity behind an id may be gone by the time a value is used.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum Wire {
    Nil,
    Bool(bool),
    Number(f64),
    Text(String),
    Actor(ActorId),
}

impl Wire {
    pub(super) fn from_payload(world: &World, payload: &Payload) -> Self {
        match payload {
            Payload::Nil => Wire::Nil,
            Payload::Bool(b) => Wire::Bool(*b),
            Payload::Number(n) => Wire::Number(*n),
            Payload::Text(s) => Wire::Text(s.clone()),
            Payload::Actor(e) => world
                .get::<ActorId>(*e)
                .map_or(Wire::Nil, |id| Wire::Actor(*id)),
        }
    }

    pub(super) fn into_payload(self, world: &World) -> Payload {
        match self {
            Wire::Nil => Payload::Nil,
            Wire::Bool(b) => Payload::Bool(b),
            Wire::Number(n) => Payload::Number(n),
            Wire::Text(s) => Payload::Text(s),
            Wire::Actor(id) => world
                .resource::<ActorIndex>()
                .get(id)
                .map_or(Payload::Nil, Payload::Actor),
        }
    }

    pub(super) fn from_lua(value: LuaValue) -> LuaResult<Self> {
        Ok(match value {
            LuaValue::Nil => Wire::Nil,
            LuaValue::Boolean(b) => Wire::Bool(b),
            LuaValue::Integer(i) => Wire::Number(i as f64),
            LuaValue::Number(n) => Wire::Number(n),
            LuaValue::String(s) => Wire::Text(s.to_str()?.to_string()),
            LuaValue::Table(t) => match t.get::<Option<u64>>("__id")? {
                Some(id) => Wire::Actor(ActorId(id)),
                None => {
                    debug!(target: "lua", "only actor tables can be sent as messages");
                    Wire::Nil
                }
            },
            other => {
                debug!(target: "lua", "dropping {} message payload", other.type_name());
                Wire::Nil
            }
        })
    }

    pub(super) fn into_lua(self, lua: &Lua) -> LuaResult<LuaValue> {
        Ok(match self {
            Wire::Nil => LuaValue::Nil,
            Wire::Bool(b) => LuaValue::Boolean(b),
            Wire::Number(n) => LuaValue::Number(n),
            Wire::Text(s) => LuaValue::String(lua.create_string(&s)?),
            Wire::Actor(id) => actor_value(lua, id)?,
        })
    }
}

fn actor_value(lua: &Lua, id: ActorId) -> LuaResult<LuaValue> {
    lua.named_registry_value::<LuaFunction>(ACTOR_CTOR)?
        .call(id.0)
}

/// `Verdict.Solid` / `Verdict.NotSolid`; anything else has no opinion.
pub(super) fn verdict_from_lua(value: &LuaValue) -> Verdict {
    let LuaValue::String(s) = value else {
        return Verdict::Unspecified;
    };
    match s.to_str() {
        Ok(s) if &*s == "solid" => Verdict::Solid,
        Ok(s) if &*s == "not-solid" => Verdict::NotSolid,
        _ => Verdict::Unspecified,
    }
}

pub(super) fn collide_table(
    lua: &Lua,
    other: Option<ActorId>,
    ev: &CollideEvent,
) -> LuaResult<LuaTable> {
    let overlap = lua.create_table()?;
    overlap.set("X", ev.overlap.x)?;
    overlap.set("Y", ev.overlap.y)?;
    overlap.set("W", ev.overlap.w)?;
    overlap.set("H", ev.overlap.h)?;

    let table = lua.create_table()?;
    if let Some(id) = other {
        table.set("Actor", actor_value(lua, id)?)?;
    }
    table.set("Overlap", overlap)?;
    table.set("InHitbox", ev.in_hitbox)?;
    table.set("Settled", ev.settled)?;
    Ok(table)
}

pub(super) fn actor_event_table(lua: &Lua, other: Option<ActorId>) -> LuaResult<LuaTable> {
    let table = lua.create_table()?;
    if let Some(id) = other {
        table.set("Actor", actor_value(lua, id)?)?;
    }
    Ok(table)
}

pub(super) fn keypress_table(lua: &Lua, ev: &KeypressEvent) -> LuaResult<LuaTable> {
    let input = &ev.input;
    let buttons: [(&str, &BoolState); 5] = [
        ("Up", &input.up),
        ("Down", &input.down),
        ("Left", &input.left),
        ("Right", &input.right),
        ("Use", &input.use_action),
    ];
    let table = lua.create_table()?;
    let pressed = lua.create_table()?;
    let released = lua.create_table()?;
    for (name, state) in buttons {
        table.set(name, state.active)?;
        pressed.set(name, state.just_pressed)?;
        released.set(name, state.just_released)?;
    }
    table.set("Pressed", pressed)?;
    table.set("Released", released)?;
    Ok(table)
}

/// Sequence of actor ids for the prelude to wrap.
fn id_list(lua: &Lua, world: &World, actors: &[Entity]) -> LuaResult<LuaTable> {
    let ids = actors
        .iter()
        .filter_map(|e| world.get::<ActorId>(*e))
        .map(|id| id.0);
    lua.create_sequence_from(ids)
}

fn frame_from_lua(value: LuaValue) -> Option<FrameId> {
    match value {
        LuaValue::Integer(i) => u32::try_from(i).ok().map(FrameId::Index),
        LuaValue::Number(n) if n >= 0.0 && n.fract() == 0.0 => Some(FrameId::Index(n as u32)),
        LuaValue::String(s) => s.to_str().ok().map(|s| FrameId::Named(s.to_string())),
        _ => None,
    }
}

struct Args<'l> {
    lua: &'l Lua,
    values: LuaMultiValue,
}

impl Args<'_> {
    fn next<T: FromLua>(&mut self) -> LuaResult<T> {
        let value = self.values.pop_front().unwrap_or(LuaValue::Nil);
        self.lua.unpack(value)
    }

    fn next_vec2(&mut self) -> LuaResult<Vec2> {
        let x: f32 = self.next()?;
        let y: f32 = self.next()?;
        Ok(Vec2::new(x, y))
    }
}

fn ret(lua: &Lua, values: impl IntoLuaMulti) -> LuaResult<LuaMultiValue> {
    values.into_lua_multi(lua)
}

/// Run one `__host` call for the actor bound to `api`.
pub(super) fn dispatch(
    lua: &Lua,
    api: &mut LuaApi<'_>,
    op: &str,
    id: Option<u64>,
    args: LuaMultiValue,
) -> LuaResult<LuaMultiValue> {
    let mut args = Args { lua, values: args };
    // Unknown or destroyed actors resolve to a placeholder that no accessor
    // can find, which turns every actor op into a no-op.
    let target = match id {
        Some(n) => api.actor_by_id(ActorId(n)).unwrap_or(Entity::PLACEHOLDER),
        None => api.me(),
    };

    match op {
        // --- identity ---
        "ID" => ret(lua, api.actor(target).id().map(|id| id.0)),
        "IsAlive" => ret(lua, api.is_alive(target)),
        "Filename" => ret(lua, api.actor(target).filename()),
        "Title" => ret(lua, api.actor(target).title()),
        "GetTag" => {
            let key: String = args.next()?;
            ret(lua, api.actor(target).tag(&key))
        }
        "GetLinks" => {
            let links = api.actor(target).links();
            ret(lua, id_list(lua, api.world(), &links)?)
        }

        // --- kinematics ---
        "Position" => {
            let p = api.actor(target).position();
            ret(lua, (p.x, p.y))
        }
        "MoveTo" => {
            let to = args.next_vec2()?;
            api.actor(target).move_to(to);
            ret(lua, ())
        }
        "Velocity" => {
            let v = api.actor(target).velocity();
            ret(lua, (v.x, v.y))
        }
        "SetVelocity" => {
            let v = args.next_vec2()?;
            api.actor(target).set_velocity(v);
            ret(lua, ())
        }
        "Size" => {
            let size = api.actor(target).size();
            ret(lua, (size.x, size.y))
        }
        "Hitbox" => {
            let r = api.actor(target).hitbox();
            ret(lua, (r.x, r.y, r.w, r.h))
        }
        "SetHitbox" => {
            let (x, y): (f32, f32) = (args.next()?, args.next()?);
            let (w, h): (f32, f32) = (args.next()?, args.next()?);
            // Rejections are logged by the accessor and leave the old hitbox.
            let accepted = api.actor(target).set_hitbox(x, y, w, h).is_ok();
            ret(lua, accepted)
        }

        // --- flags ---
        "IsMobile" => ret(lua, api.actor(target).is_mobile()),
        "SetMobile" => {
            let on: bool = args.next()?;
            api.actor(target).set_mobile(on);
            ret(lua, ())
        }
        "HasGravity" => ret(lua, api.actor(target).has_gravity()),
        "SetGravity" => {
            let on: bool = args.next()?;
            api.actor(target).set_gravity(on);
            ret(lua, ())
        }
        "IsFrozen" => ret(lua, api.actor(target).is_frozen()),
        "Freeze" => {
            api.actor(target).freeze();
            ret(lua, ())
        }
        "Unfreeze" => {
            api.actor(target).unfreeze();
            ret(lua, ())
        }
        "Grounded" => ret(lua, api.actor(target).grounded()),
        "IsWet" => ret(lua, api.actor(target).is_wet()),
        "SetWet" => {
            let on: bool = args.next()?;
            api.actor(target).set_wet(on);
            ret(lua, ())
        }
        "SetNoclip" => {
            let on: bool = args.next()?;
            api.actor(target).set_noclip(on);
            ret(lua, ())
        }
        "IsPlayer" => ret(lua, api.actor(target).is_player()),
        "HasInventory" => ret(lua, api.actor(target).has_inventory()),
        "SetInventory" => {
            let on: bool = args.next()?;
            api.actor(target).set_inventory(on);
            ret(lua, ())
        }
        "Invulnerable" => ret(lua, api.actor(target).invulnerable()),
        "SetInvulnerable" => {
            let on: bool = args.next()?;
            api.actor(target).set_invulnerable(on);
            ret(lua, ())
        }

        // --- inventory ---
        "AddItem" => {
            let item: String = args.next()?;
            let qty: Option<i64> = args.next()?;
            let qty = u32::try_from(qty.unwrap_or(0).max(0)).unwrap_or(u32::MAX);
            api.actor(target).add_item(&item, qty);
            ret(lua, ())
        }
        "RemoveItem" => {
            let item: String = args.next()?;
            let qty: Option<i64> = args.next()?;
            let qty = u32::try_from(qty.unwrap_or(0).max(0)).unwrap_or(u32::MAX);
            ret(lua, api.actor(target).remove_item(&item, qty))
        }
        "HasItem" => {
            let item: String = args.next()?;
            let held = api.actor(target).has_item(&item);
            ret(lua, held.map_or(-1, i64::from))
        }
        "ListItems" => {
            let items = lua.create_table()?;
            for (name, qty) in api.actor(target).list_items() {
                items.set(name, qty)?;
            }
            ret(lua, items)
        }
        "ClearInventory" => {
            api.actor(target).clear_inventory();
            ret(lua, ())
        }

        // --- rendering ---
        "IsVisible" => ret(lua, api.actor(target).is_visible()),
        "Show" => {
            api.actor(target).show();
            ret(lua, ())
        }
        "Hide" => {
            api.actor(target).hide();
            ret(lua, ())
        }
        "ShowFrame" => {
            let value: LuaValue = args.next()?;
            match frame_from_lua(value) {
                Some(frame) => api.actor(target).show_frame(frame),
                None => debug!(target: "lua", "{}: ShowFrame needs an index or name", api.label()),
            }
            ret(lua, ())
        }
        "Destroy" => {
            api.destroy(target);
            ret(lua, ())
        }

        // --- animation (running actor only) ---
        "AddAnimation" => {
            let name: String = args.next()?;
            let frame_ms: f32 = args.next()?;
            let list: Option<LuaTable> = args.next()?;
            let mut frames = Vec::new();
            if let Some(list) = list {
                for value in list.sequence_values::<LuaValue>() {
                    if let Some(frame) = frame_from_lua(value?) {
                        frames.push(frame);
                    }
                }
            }
            ret(lua, api.add_animation(&name, frame_ms, frames).is_ok())
        }
        "PlayAnimation" => {
            let name: String = args.next()?;
            let on_done: Option<LuaFunction> = args.next()?;
            let started = match on_done {
                Some(callback) => api.play_animation_then(&name, move |doodad, api| {
                    doodad.with_host(api, |_| callback.call::<()>(()))
                }),
                None => api.play_animation(&name),
            };
            ret(lua, started)
        }
        "StopAnimation" => {
            api.stop_animation();
            ret(lua, ())
        }
        "IsAnimating" => ret(lua, api.is_animating()),

        // --- events ---
        "OnCollide" => {
            let handler: LuaFunction = args.next()?;
            api.on_collide(move |doodad, api, ev| {
                let other = api.world().get::<ActorId>(ev.actor).copied();
                doodad.with_host(api, |lua| {
                    let verdict: LuaValue = handler.call(collide_table(lua, other, ev)?)?;
                    Ok(verdict_from_lua(&verdict))
                })
            });
            ret(lua, ())
        }
        "OnLeave" => {
            let handler: LuaFunction = args.next()?;
            api.on_leave(move |doodad, api, ev| {
                doodad.with_host(api, |lua| {
                    handler.call::<()>(actor_event_table(lua, Some(ev.id))?)
                })
            });
            ret(lua, ())
        }
        "OnUse" => {
            let handler: LuaFunction = args.next()?;
            api.on_use(move |doodad, api, ev| {
                let other = api.world().get::<ActorId>(ev.actor).copied();
                doodad.with_host(api, |lua| {
                    handler.call::<()>(actor_event_table(lua, other)?)
                })
            });
            ret(lua, ())
        }
        "OnKeypress" => {
            let handler: LuaFunction = args.next()?;
            api.on_keypress(move |doodad, api, ev| {
                doodad.with_host(api, |lua| handler.call::<()>(keypress_table(lua, ev)?))
            });
            ret(lua, ())
        }

        // --- messages ---
        "Subscribe" => {
            let topic: String = args.next()?;
            let handler: LuaFunction = args.next()?;
            let sub = api.subscribe(topic, move |doodad, api, payload| {
                let arg = Wire::from_payload(api.world(), payload);
                let reply = doodad.with_host(api, |lua| {
                    let reply: LuaValue = handler.call(arg.into_lua(lua)?)?;
                    Wire::from_lua(reply)
                })?;
                Ok(reply.into_payload(api.world()))
            });
            ret(lua, sub.0)
        }
        "Unsubscribe" => {
            let sub: Option<u64> = args.next()?;
            if let Some(sub) = sub {
                api.unsubscribe(SubscriptionId(sub));
            }
            ret(lua, ())
        }
        "Publish" => {
            let topic: String = args.next()?;
            let value: LuaValue = args.next()?;
            let payload = Wire::from_lua(value)?.into_payload(api.world());
            api.publish(&topic, payload);
            ret(lua, ())
        }
        "Request" => {
            let topic: String = args.next()?;
            let value: LuaValue = args.next()?;
            let payload = Wire::from_lua(value)?.into_payload(api.world());
            let replies = api.request(&topic, payload);
            let out = lua.create_table()?;
            for (i, reply) in replies.iter().enumerate() {
                out.set(i + 1, Wire::from_payload(api.world(), reply).into_lua(lua)?)?;
            }
            ret(lua, out)
        }

        // --- timers ---
        "SetTimeout" | "SetInterval" => {
            let callback: LuaFunction = args.next()?;
            let ms: Option<f64> = args.next()?;
            let ms = ms.unwrap_or(0.0);
            let timer = if op == "SetTimeout" {
                api.set_timeout(ms, move |doodad, api| {
                    doodad.with_host(api, |_| callback.call::<()>(()))
                })
            } else {
                api.set_interval(ms, move |doodad, api| {
                    doodad.with_host(api, |_| callback.call::<()>(()))
                })
            };
            ret(lua, timer.0)
        }
        "ClearTimer" => {
            let timer: Option<u32> = args.next()?;
            if let Some(timer) = timer {
                api.clear_timer(TimerId(timer));
            }
            ret(lua, ())
        }

        // --- level services ---
        "PlaySound" => {
            let name: String = args.next()?;
            api.play_sound(&name);
            ret(lua, ())
        }
        "Flash" => {
            let message: String = args.next()?;
            api.flash(&message);
            ret(lua, ())
        }
        "Difficulty" => ret(lua, api.difficulty()),
        "SetCheckpoint" => {
            let at = args.next_vec2()?;
            api.set_checkpoint(at);
            ret(lua, ())
        }
        "Checkpoint" => match api.checkpoint() {
            Some(p) => ret(lua, (p.x, p.y)),
            None => ret(lua, ()),
        },
        "EndLevel" => {
            api.end_level();
            ret(lua, ())
        }
        "FailLevel" => {
            let reason: Option<String> = args.next()?;
            api.fail_level(reason.as_deref().unwrap_or(""));
            ret(lua, ())
        }
        "ResetTimer" => {
            api.reset_timer();
            ret(lua, ())
        }
        "Tick" => ret(lua, api.tick()),
        "Now" => ret(lua, api.now_ms()),
        "FindPlayer" => {
            let player = api.find_player();
            let id = player.and_then(|e| api.world().get::<ActorId>(e).copied());
            ret(lua, id.map(|id| id.0))
        }
        "ActorsAt" => {
            let at = args.next_vec2()?;
            let found = api.actors_at(at);
            ret(lua, id_list(lua, api.world(), &found)?)
        }
        _ => Err(LuaError::RuntimeError(format!("unknown host call '{}'", op))),
    }
}
