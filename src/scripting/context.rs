//! Callback-free capabilities available to a running handler.

use bevy_ecs::prelude::*;
use log::{debug, info, warn};

use crate::components::actor::{ActorFlags, ActorId, ActorInfo};
use crate::components::animation::{Animator, FrameId};
use crate::components::boxcollider::BoxCollider;
use crate::components::mapposition::MapPosition;
use crate::components::timer::{ActorTimers, TimerId};
use crate::error::ScriptResult;
use crate::events::host::HostCmd;
use crate::geometry::Point;
use crate::resources::actorindex::ActorIndex;
use crate::resources::hostlink::HostLink;
use crate::resources::levelstate::{LevelOutcome, LevelState};
use crate::resources::worldtime::WorldTime;

use super::actor::ActorMut;
use super::host::ScriptHost;
use super::payload::Payload;

/// The world as seen from inside one actor's handler.
pub struct ScriptCtx<'w> {
    pub(crate) world: &'w mut World,
    pub(crate) host: &'w mut ScriptHost,
    me: Entity,
}

impl<'w> ScriptCtx<'w> {
    pub(crate) fn new(world: &'w mut World, host: &'w mut ScriptHost, me: Entity) -> Self {
        Self { world, host, me }
    }

    /// Shorter-lived context over the same actor.
    pub fn reborrow(&mut self) -> ScriptCtx<'_> {
        ScriptCtx {
            world: &mut *self.world,
            host: &mut *self.host,
            me: self.me,
        }
    }

    /// The actor whose handler is running.
    pub fn me(&self) -> Entity {
        self.me
    }

    pub fn world(&self) -> &World {
        self.world
    }

    pub fn is_alive(&self, actor: Entity) -> bool {
        self.world.get::<ActorId>(actor).is_some()
    }

    /// Accessors for the running actor.
    pub fn this(&mut self) -> ActorMut<'_> {
        ActorMut::new(self.world, self.me)
    }

    /// Accessors for any actor. Operations on a destroyed actor are no-ops.
    pub fn actor(&mut self, actor: Entity) -> ActorMut<'_> {
        ActorMut::new(self.world, actor)
    }

    /// Look an actor up by its stable id.
    pub fn actor_by_id(&self, id: ActorId) -> Option<Entity> {
        self.world.resource::<ActorIndex>().get(id)
    }

    /// Remove an actor from the level, cancelling its timers and
    /// subscriptions. Destroying the running actor is allowed; its handler
    /// finishes but nothing is delivered to it afterwards.
    pub fn destroy(&mut self, actor: Entity) {
        self.host.destroy(self.world, actor);
    }

    /// Label of the running actor for log lines.
    pub fn label(&self) -> String {
        self.world
            .get::<ActorInfo>(self.me)
            .map(|info| info.label().to_string())
            .unwrap_or_else(|| format!("{:?}", self.me))
    }

    // --- messaging ---

    /// Deliver `payload` to every subscriber of `topic` before returning.
    pub fn publish(&mut self, topic: &str, payload: impl Into<Payload>) {
        let me = self.me;
        self.host
            .publish(self.world, Some(me), topic, &payload.into());
    }

    /// Same delivery as [`publish`](Self::publish).
    pub fn broadcast(&mut self, topic: &str, payload: impl Into<Payload>) {
        self.publish(topic, payload);
    }

    /// Publish and collect every non-nil reply.
    pub fn request(&mut self, topic: &str, payload: impl Into<Payload>) -> Vec<Payload> {
        let me = self.me;
        self.host
            .request(self.world, Some(me), topic, &payload.into())
    }

    // --- animation ---

    /// Register (or replace) a frame sequence for the running actor.
    /// A malformed sequence is rejected and the previous one kept.
    pub fn add_animation(
        &mut self,
        name: &str,
        frame_ms: f32,
        frames: Vec<FrameId>,
    ) -> ScriptResult<()> {
        let me = self.me;
        let label = self.label();
        let Some(mut animator) = self.world.get_mut::<Animator>(me) else {
            return Ok(());
        };
        animator.add(name, frame_ms, frames).inspect_err(|e| {
            warn!(target: "script", "{}: rejected animation: {}", label, e);
        })
    }

    /// Halt playback, leaving the current frame shown.
    pub fn stop_animation(&mut self) {
        let me = self.me;
        if let Some(mut animator) = self.world.get_mut::<Animator>(me) {
            animator.stop();
        }
    }

    pub fn is_animating(&self) -> bool {
        self.world
            .get::<Animator>(self.me)
            .is_some_and(|a| a.is_animating())
    }

    // --- timers ---

    /// Whether a timer of the running actor is still scheduled.
    pub fn timer_pending(&self, id: TimerId) -> bool {
        self.world
            .get::<ActorTimers>(self.me)
            .is_some_and(|t| t.contains(id))
    }

    pub fn now_ms(&self) -> f64 {
        self.world.resource::<WorldTime>().elapsed_ms
    }

    pub fn tick(&self) -> u64 {
        self.world.resource::<WorldTime>().tick
    }

    // --- level services ---

    pub(crate) fn send(&self, cmd: HostCmd) {
        self.world.resource::<HostLink>().send(cmd);
    }

    pub fn play_sound(&self, name: &str) {
        self.send(HostCmd::PlaySound {
            name: name.to_string(),
        });
    }

    /// Show a short message to the player.
    pub fn flash(&self, message: &str) {
        info!(target: "level", "flash: {}", message);
        self.send(HostCmd::Flash {
            message: message.to_string(),
        });
    }

    /// The player-controlled actor, if one exists.
    pub fn find_player(&mut self) -> Option<Entity> {
        let mut query = self.world.query::<(Entity, &ActorId, &ActorFlags)>();
        query
            .iter(self.world)
            .filter(|(_, _, flags)| flags.is_player)
            .min_by_key(|(_, id, _)| **id)
            .map(|(e, _, _)| e)
    }

    /// Actors whose sprite bounds contain `point`, in spawn order.
    pub fn actors_at(&mut self, point: Point) -> Vec<Entity> {
        let mut query = self
            .world
            .query::<(Entity, &ActorId, &MapPosition, &BoxCollider)>();
        let mut found: Vec<(ActorId, Entity)> = query
            .iter(self.world)
            .filter(|(_, _, pos, collider)| collider.contains_point(pos.pos, point))
            .map(|(e, id, _, _)| (*id, e))
            .collect();
        found.sort_by_key(|(id, _)| *id);
        found.into_iter().map(|(_, e)| e).collect()
    }

    pub fn difficulty(&self) -> i32 {
        self.world.resource::<LevelState>().difficulty
    }

    pub fn set_checkpoint(&mut self, position: Point) {
        self.world.resource_mut::<LevelState>().checkpoint = Some(position);
        self.send(HostCmd::SetCheckpoint { position });
    }

    pub fn checkpoint(&self) -> Option<Point> {
        self.world.resource::<LevelState>().checkpoint
    }

    pub fn end_level(&mut self) {
        self.finish(LevelOutcome::Completed, HostCmd::EndLevel);
    }

    pub fn fail_level(&mut self, reason: &str) {
        self.finish(
            LevelOutcome::Failed(reason.to_string()),
            HostCmd::FailLevel {
                reason: reason.to_string(),
            },
        );
    }

    fn finish(&mut self, outcome: LevelOutcome, cmd: HostCmd) {
        if self.world.resource::<LevelState>().is_over() {
            debug!(target: "level", "level already finished, ignoring {:?}", cmd);
            return;
        }
        info!(target: "level", "{} ended the level: {:?}", self.label(), outcome);
        self.world.resource_mut::<LevelState>().outcome = outcome;
        self.send(cmd);
    }

    /// Ask the host to reset the level's elapsed-time counter.
    pub fn reset_timer(&self) {
        self.send(HostCmd::ResetTimer);
    }
}
