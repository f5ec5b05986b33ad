//! The script host: one isolated script instance per actor.
//!
//! # Dispatch
//!
//! Every call into a script goes through [`ScriptHost::invoke`], which takes
//! the actor's instance out of its slot, runs it with a [`ScriptCtx`] and
//! puts it back. While it is out the slot is marked busy, and:
//!
//! - the handler may reach *other* actors synchronously (publishing a
//!   message runs their handlers before `publish` returns)
//! - messages addressed to the busy actor itself are deferred and delivered
//!   right after its handler returns
//! - destroying the busy actor removes the slot, so the instance is dropped
//!   instead of being put back
//!
//! # Faults
//!
//! A handler returning `Err` is logged and the actor is marked faulted until
//! the next tick: any further handler for it in the same tick is skipped.
//! Its state and registrations are kept for later ticks.
//!
//! # Message depth
//!
//! Nested publishes run depth-first. A publish nested deeper than
//! [`SimConfig::max_publish_depth`] is dropped with a warning, and at most
//! [`SimConfig::max_deliveries_per_tick`] deliveries happen per tick, so a
//! handler that re-publishes its own topic always terminates.

use std::collections::VecDeque;

use bevy_ecs::prelude::*;
use log::{debug, error, info, warn};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::components::actor::{ActorId, ActorInfo};
use crate::components::timer::TimerId;
use crate::error::ScriptResult;
use crate::events::collision::{CollideEvent, LeaveEvent, Verdict};
use crate::events::host::HostCmd;
use crate::events::input::{KeypressEvent, UseEvent};
use crate::resources::actorindex::ActorIndex;
use crate::resources::hostlink::HostLink;
use crate::resources::messagebus::{MessageBus, SubscriptionId};
use crate::resources::simconfig::SimConfig;

use super::context::ScriptCtx;
use super::payload::Payload;
use super::script::{ActorScript, HandlerKind};

enum Slot {
    Idle(Box<dyn ActorScript>),
    Busy,
}

/// A message that reached an actor while its own handler was running.
struct Deferred {
    sub: SubscriptionId,
    payload: Payload,
    depth: usize,
}

#[derive(Default)]
pub struct ScriptHost {
    slots: FxHashMap<Entity, Slot>,
    /// Actors whose `main` has not run yet, in spawn order.
    pending_main: Vec<Entity>,
    /// Per-actor queues of messages held back while the actor was busy.
    deferred: FxHashMap<Entity, VecDeque<Deferred>>,
    /// Actors with deferred messages, oldest first. May hold stale entries.
    deferred_order: VecDeque<Entity>,
    faulted: FxHashSet<Entity>,
    depth: usize,
    deliveries: usize,
    budget_exhausted: bool,
}

impl ScriptHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a script to `actor`. Its `main` runs on the next
    /// [`run_pending_mains`](Self::run_pending_mains).
    pub fn install(&mut self, actor: Entity, script: Box<dyn ActorScript>) {
        if self.slots.insert(actor, Slot::Idle(script)).is_some() {
            warn!(target: "script", "replacing script of {:?}", actor);
        }
        self.pending_main.retain(|e| *e != actor);
        self.pending_main.push(actor);
    }

    pub fn has_script(&self, actor: Entity) -> bool {
        self.slots.contains_key(&actor)
    }

    pub fn script_count(&self) -> usize {
        self.slots.len()
    }

    /// Whether `actor` has at least one handler of `kind`.
    pub fn handles(&self, actor: Entity, kind: HandlerKind) -> bool {
        matches!(self.slots.get(&actor), Some(Slot::Idle(s)) if s.handles(kind))
    }

    pub fn is_faulted(&self, actor: Entity) -> bool {
        self.faulted.contains(&actor)
    }

    /// Reset per-tick bookkeeping.
    pub fn begin_tick(&mut self) {
        self.faulted.clear();
        self.deliveries = 0;
        self.budget_exhausted = false;
    }

    /// Run `main` for every actor installed since the last call.
    pub fn run_pending_mains(&mut self, world: &mut World) {
        let pending = std::mem::take(&mut self.pending_main);
        for actor in pending {
            self.invoke(world, actor, "main", |script, ctx| script.run_main(ctx));
        }
    }

    /// Remove an actor and everything bound to it: script instance,
    /// timers, subscriptions, components.
    pub fn destroy(&mut self, world: &mut World, actor: Entity) {
        let Some(id) = world.get::<ActorId>(actor).copied() else {
            return;
        };
        let label = world
            .get::<ActorInfo>(actor)
            .map(|i| i.label().to_string())
            .unwrap_or_default();
        self.slots.remove(&actor);
        self.pending_main.retain(|e| *e != actor);
        self.deferred.remove(&actor);
        let dropped = world.resource_mut::<MessageBus>().unsubscribe_actor(actor);
        world.resource_mut::<ActorIndex>().remove(id);
        world.resource::<HostLink>().send(HostCmd::Despawned { actor });
        world.despawn(actor);
        info!(
            target: "level",
            "destroyed {} {} ({} subscriptions dropped)", id, label, dropped
        );
    }

    /// Run one script call for `actor`, then whatever was deferred for it.
    ///
    /// Returns `None` when the actor has no script, is busy, is faulted this
    /// tick, or the call failed.
    fn invoke<R>(
        &mut self,
        world: &mut World,
        actor: Entity,
        what: &str,
        f: impl FnOnce(&mut dyn ActorScript, &mut ScriptCtx<'_>) -> ScriptResult<R>,
    ) -> Option<R> {
        let out = self.call(world, actor, what, f);
        self.flush_deferred(world, actor);
        out
    }

    fn call<R>(
        &mut self,
        world: &mut World,
        actor: Entity,
        what: &str,
        f: impl FnOnce(&mut dyn ActorScript, &mut ScriptCtx<'_>) -> ScriptResult<R>,
    ) -> Option<R> {
        if self.faulted.contains(&actor) {
            debug!(target: "script", "skipping {} for faulted {:?}", what, actor);
            return None;
        }
        let mut script = match self.slots.get_mut(&actor) {
            Some(slot @ Slot::Idle(_)) => match std::mem::replace(slot, Slot::Busy) {
                Slot::Idle(script) => script,
                Slot::Busy => return None,
            },
            _ => return None,
        };

        let result = {
            let mut ctx = ScriptCtx::new(world, self, actor);
            f(script.as_mut(), &mut ctx)
        };

        // A destroyed actor has no slot any more; its script is dropped here.
        if let Some(slot) = self.slots.get_mut(&actor) {
            *slot = Slot::Idle(script);
        }

        match result {
            Ok(value) => Some(value),
            Err(e) => {
                let label = world
                    .get::<ActorInfo>(actor)
                    .map(|i| i.label().to_string())
                    .unwrap_or_else(|| format!("{:?}", actor));
                error!(target: "script", "{}: fault in {}: {}", label, what, e);
                self.faulted.insert(actor);
                None
            }
        }
    }

    /// Deliver messages that arrived for `actor` while it was busy.
    ///
    /// Messages the actor sends itself while draining land in the same
    /// queue, so this loops instead of recursing.
    fn flush_deferred(&mut self, world: &mut World, actor: Entity) {
        // Still running further up the stack; that call drains the queue.
        if matches!(self.slots.get(&actor), Some(Slot::Busy)) {
            return;
        }
        while let Some(item) = self.deferred.get_mut(&actor).and_then(VecDeque::pop_front) {
            let outer = self.depth;
            self.depth = item.depth;
            self.call(world, actor, "message", |script, ctx| {
                script.message(ctx, item.sub, &item.payload)
            });
            self.depth = outer;
        }
        self.deferred.remove(&actor);
    }

    fn defer(&mut self, actor: Entity, item: Deferred) {
        let queue = self.deferred.entry(actor).or_default();
        if queue.is_empty() {
            self.deferred_order.push_back(actor);
        }
        queue.push_back(item);
    }

    // --- event dispatch ---

    /// Ask `receiver` whether it blocks `ev.actor`.
    pub fn collide(&mut self, world: &mut World, receiver: Entity, ev: &CollideEvent) -> Verdict {
        self.invoke(world, receiver, "OnCollide", |script, ctx| {
            script.collide(ctx, ev)
        })
        .unwrap_or_default()
    }

    pub fn leave(&mut self, world: &mut World, receiver: Entity, ev: &LeaveEvent) {
        self.invoke(world, receiver, "OnLeave", |script, ctx| script.leave(ctx, ev));
    }

    pub fn used(&mut self, world: &mut World, receiver: Entity, ev: &UseEvent) {
        self.invoke(world, receiver, "OnUse", |script, ctx| script.used(ctx, ev));
    }

    pub fn keypress(&mut self, world: &mut World, receiver: Entity, ev: &KeypressEvent) {
        self.invoke(world, receiver, "OnKeypress", |script, ctx| {
            script.keypress(ctx, ev)
        });
    }

    pub fn fire_timer(&mut self, world: &mut World, actor: Entity, id: TimerId) {
        self.invoke(world, actor, "timer", |script, ctx| script.timer(ctx, id));
    }

    pub fn animation_finished(&mut self, world: &mut World, actor: Entity, ticket: u64) {
        self.invoke(world, actor, "animation", |script, ctx| {
            script.animation_finished(ctx, ticket)
        });
    }

    // --- messaging ---

    /// Deliver `payload` to every current subscriber of `topic`.
    pub fn publish(
        &mut self,
        world: &mut World,
        from: Option<Entity>,
        topic: &str,
        payload: &Payload,
    ) {
        self.deliver(world, from, topic, payload, false);
    }

    /// Publish and collect the non-nil replies of the handlers that ran.
    pub fn request(
        &mut self,
        world: &mut World,
        from: Option<Entity>,
        topic: &str,
        payload: &Payload,
    ) -> Vec<Payload> {
        self.deliver(world, from, topic, payload, true)
    }

    fn deliver(
        &mut self,
        world: &mut World,
        from: Option<Entity>,
        topic: &str,
        payload: &Payload,
        collect: bool,
    ) -> Vec<Payload> {
        let (max_depth, budget) = {
            let cfg = world.resource::<SimConfig>();
            (cfg.max_publish_depth, cfg.max_deliveries_per_tick)
        };
        let mut replies = Vec::new();
        if self.depth >= max_depth {
            warn!(
                target: "script",
                "dropping publish of '{}' from {:?}: nesting deeper than {}",
                topic, from, max_depth
            );
            return replies;
        }

        let subscribers = world.resource::<MessageBus>().snapshot(topic);
        self.depth += 1;
        for sub in subscribers.iter().copied() {
            if self.deliveries >= budget {
                if !self.budget_exhausted {
                    error!(
                        target: "script",
                        "message budget of {} deliveries exhausted this tick; dropping '{}'",
                        budget, topic
                    );
                    self.budget_exhausted = true;
                }
                break;
            }
            match self.slots.get(&sub.actor) {
                None => continue,
                // The publisher (or anything up the call chain) hears the
                // message after its handler returns; everyone else runs
                // depth-first right here.
                Some(Slot::Busy) => {
                    self.deliveries += 1;
                    self.defer(
                        sub.actor,
                        Deferred {
                            sub: sub.id,
                            payload: payload.clone(),
                            depth: self.depth,
                        },
                    );
                    continue;
                }
                Some(Slot::Idle(_)) => {}
            }
            self.deliveries += 1;
            let reply = self.invoke(world, sub.actor, "message", |script, ctx| {
                script.message(ctx, sub.id, payload)
            });
            if collect && let Some(reply) = reply.filter(|r| !r.is_nil()) {
                replies.push(reply);
            }
        }
        self.depth -= 1;
        replies
    }

    /// Deliver anything still deferred, e.g. after a top-level call.
    pub fn flush_all_deferred(&mut self, world: &mut World) {
        while let Some(actor) = self.deferred_order.pop_front() {
            if !self.slots.contains_key(&actor) {
                self.deferred.remove(&actor);
                continue;
            }
            self.flush_deferred(world, actor);
        }
    }
}
