//! Capability surface handed to a running script.
//!
//! [`Api`] derefs to [`ScriptCtx`] for everything that does not involve a
//! callback (actor accessors, publishing, level services) and adds the
//! registration calls that store closures with the actor's script:
//! event handlers, timers, subscriptions and animation completion.

use std::ops::{Deref, DerefMut};

use log::debug;

use crate::components::animation::Animator;
use crate::components::timer::{ActorTimers, TimerId};
use crate::error::ScriptResult;
use crate::events::collision::{CollideEvent, LeaveEvent, Verdict};
use crate::events::host::HostCmd;
use crate::events::input::{KeypressEvent, UseEvent};
use crate::resources::messagebus::{MessageBus, SubscriptionId};

use super::context::ScriptCtx;
use super::payload::Payload;
use super::script::{AnimationChange, Staged};

pub struct Api<'a, S> {
    ctx: ScriptCtx<'a>,
    staged: &'a mut Staged<S>,
}

impl<'a, S> Deref for Api<'a, S> {
    type Target = ScriptCtx<'a>;
    fn deref(&self) -> &Self::Target {
        &self.ctx
    }
}

impl<'a, S> DerefMut for Api<'a, S> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.ctx
    }
}

impl<'a, S: 'static> Api<'a, S> {
    pub(crate) fn new(ctx: ScriptCtx<'a>, staged: &'a mut Staged<S>) -> Self {
        Self { ctx, staged }
    }

    /// Called while another actor touches this one; the result decides
    /// whether this actor blocks it.
    pub fn on_collide(
        &mut self,
        handler: impl FnMut(&mut S, &mut Api<'_, S>, &CollideEvent) -> ScriptResult<Verdict> + 'static,
    ) {
        self.staged.hooks.collide.push(Box::new(handler));
    }

    pub fn on_leave(
        &mut self,
        handler: impl FnMut(&mut S, &mut Api<'_, S>, &LeaveEvent) -> ScriptResult<()> + 'static,
    ) {
        self.staged.hooks.leave.push(Box::new(handler));
    }

    pub fn on_use(
        &mut self,
        handler: impl FnMut(&mut S, &mut Api<'_, S>, &UseEvent) -> ScriptResult<()> + 'static,
    ) {
        self.staged.hooks.used.push(Box::new(handler));
    }

    pub fn on_keypress(
        &mut self,
        handler: impl FnMut(&mut S, &mut Api<'_, S>, &KeypressEvent) -> ScriptResult<()> + 'static,
    ) {
        self.staged.hooks.keypress.push(Box::new(handler));
    }

    /// Run `callback` once, `delay_ms` from now.
    pub fn set_timeout(
        &mut self,
        delay_ms: f64,
        callback: impl FnMut(&mut S, &mut Api<'_, S>) -> ScriptResult<()> + 'static,
    ) -> TimerId {
        self.schedule(delay_ms, false, Box::new(callback))
    }

    /// Run `callback` every `interval_ms` until cleared or the actor is
    /// destroyed.
    pub fn set_interval(
        &mut self,
        interval_ms: f64,
        callback: impl FnMut(&mut S, &mut Api<'_, S>) -> ScriptResult<()> + 'static,
    ) -> TimerId {
        self.schedule(interval_ms, true, Box::new(callback))
    }

    fn schedule(
        &mut self,
        delay_ms: f64,
        repeat: bool,
        callback: super::script::TimerFn<S>,
    ) -> TimerId {
        let me = self.ctx.me();
        let now = self.ctx.now_ms();
        let Some(mut timers) = self.ctx.world.get_mut::<ActorTimers>(me) else {
            debug!(target: "script", "timer requested by despawned actor {:?}", me);
            return TimerId(0);
        };
        let id = timers.schedule(now, delay_ms, repeat);
        self.staged.hooks.timers.insert(id, callback);
        id
    }

    /// Cancel one of this actor's timers. Unknown ids are ignored.
    pub fn clear_timer(&mut self, id: TimerId) {
        let me = self.ctx.me();
        if let Some(mut timers) = self.ctx.world.get_mut::<ActorTimers>(me) {
            timers.cancel(id);
        }
        self.staged.hooks.timers.remove(&id);
        self.staged.cancelled.push(id);
    }

    /// Listen on `topic` for as long as this actor lives. The handler's
    /// return value is the reply seen by [`ScriptCtx::request`].
    pub fn subscribe(
        &mut self,
        topic: impl Into<String>,
        handler: impl FnMut(&mut S, &mut Api<'_, S>, &Payload) -> ScriptResult<Payload> + 'static,
    ) -> SubscriptionId {
        let me = self.ctx.me();
        let id = self
            .ctx
            .world
            .resource_mut::<MessageBus>()
            .subscribe(topic, me);
        self.staged.hooks.messages.insert(id, Box::new(handler));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.ctx.world.resource_mut::<MessageBus>().unsubscribe(id);
        self.staged.hooks.messages.remove(&id);
        self.staged.unsubscribed.push(id);
    }

    /// Play `name` from its first frame without a completion handler.
    /// Returns `false` if the animation does not exist.
    pub fn play_animation(&mut self, name: &str) -> bool {
        self.start_animation(name, None)
    }

    /// Play `name` and run `on_done` once after its last frame.
    ///
    /// `on_done` is dropped without running if playback is stopped or
    /// replaced first.
    pub fn play_animation_then(
        &mut self,
        name: &str,
        on_done: impl FnOnce(&mut S, &mut Api<'_, S>) -> ScriptResult<()> + 'static,
    ) -> bool {
        self.start_animation(name, Some(Box::new(on_done)))
    }

    fn start_animation(
        &mut self,
        name: &str,
        on_done: Option<super::script::AnimationFn<S>>,
    ) -> bool {
        let me = self.ctx.me();
        let started = self
            .ctx
            .world
            .get_mut::<Animator>(me)
            .and_then(|mut animator| animator.play(name));
        let Some((ticket, frame)) = started else {
            debug!(target: "script", "{}: no animation named '{}'", self.ctx.label(), name);
            return false;
        };
        self.ctx.send(HostCmd::ShowFrame { actor: me, frame });
        self.staged.animation = AnimationChange::Replace(ticket, on_done);
        true
    }

    /// Halt playback; the completion handler is discarded.
    pub fn stop_animation(&mut self) {
        self.ctx.stop_animation();
        self.staged.animation = AnimationChange::Clear;
    }
}
