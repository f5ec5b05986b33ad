//! Per-actor script state and handler registries.
//!
//! A [`Script<S>`] owns one actor's private state `S` together with every
//! handler that actor registered: event handlers per kind, timer callbacks,
//! message subscriptions and the pending animation completion handler.
//! Nothing in here is shared between actors, even between two instances of
//! the same doodad.
//!
//! Handlers registered while one of the actor's own handlers is running go
//! into a staging area and are merged once that handler returns, so the
//! lists being iterated are never modified mid-dispatch.
//!
//! The [`ScriptHost`](super::ScriptHost) stores scripts type-erased as
//! [`ActorScript`] trait objects.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::components::timer::TimerId;
use crate::error::ScriptResult;
use crate::events::collision::{CollideEvent, LeaveEvent, Verdict};
use crate::events::input::{KeypressEvent, UseEvent};
use crate::resources::messagebus::SubscriptionId;

use super::api::Api;
use super::context::ScriptCtx;
use super::payload::Payload;

pub(crate) type CollideFn<S> =
    Box<dyn FnMut(&mut S, &mut Api<'_, S>, &CollideEvent) -> ScriptResult<Verdict>>;
pub(crate) type EventFn<S, E> = Box<dyn FnMut(&mut S, &mut Api<'_, S>, &E) -> ScriptResult<()>>;
pub(crate) type TimerFn<S> = Box<dyn FnMut(&mut S, &mut Api<'_, S>) -> ScriptResult<()>>;
pub(crate) type MessageFn<S> =
    Box<dyn FnMut(&mut S, &mut Api<'_, S>, &Payload) -> ScriptResult<Payload>>;
pub(crate) type AnimationFn<S> = Box<dyn FnOnce(&mut S, &mut Api<'_, S>) -> ScriptResult<()>>;
type MainFn<S> = Box<dyn FnOnce(&mut S, &mut Api<'_, S>) -> ScriptResult<()>>;

/// Behavior of a doodad: its `main` registers handlers, timers and
/// animations through the [`Api`]. It runs exactly once per actor.
pub trait Doodad: Sized + 'static {
    fn main(&mut self, api: &mut Api<'_, Self>) -> ScriptResult<()>;
}

/// Event kinds an actor can register handlers for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    Collide,
    Leave,
    Use,
    Keypress,
}

/// Type-erased script, as stored by the host.
pub trait ActorScript {
    fn run_main(&mut self, ctx: &mut ScriptCtx<'_>) -> ScriptResult<()>;
    fn handles(&self, kind: HandlerKind) -> bool;
    fn collide(&mut self, ctx: &mut ScriptCtx<'_>, ev: &CollideEvent) -> ScriptResult<Verdict>;
    fn leave(&mut self, ctx: &mut ScriptCtx<'_>, ev: &LeaveEvent) -> ScriptResult<()>;
    fn used(&mut self, ctx: &mut ScriptCtx<'_>, ev: &UseEvent) -> ScriptResult<()>;
    fn keypress(&mut self, ctx: &mut ScriptCtx<'_>, ev: &KeypressEvent) -> ScriptResult<()>;
    fn timer(&mut self, ctx: &mut ScriptCtx<'_>, id: TimerId) -> ScriptResult<()>;
    fn message(
        &mut self,
        ctx: &mut ScriptCtx<'_>,
        sub: SubscriptionId,
        payload: &Payload,
    ) -> ScriptResult<Payload>;
    fn animation_finished(&mut self, ctx: &mut ScriptCtx<'_>, ticket: u64) -> ScriptResult<()>;
}

pub(crate) struct Hooks<S> {
    pub(crate) collide: SmallVec<[CollideFn<S>; 1]>,
    pub(crate) leave: SmallVec<[EventFn<S, LeaveEvent>; 1]>,
    pub(crate) used: SmallVec<[EventFn<S, UseEvent>; 1]>,
    pub(crate) keypress: SmallVec<[EventFn<S, KeypressEvent>; 1]>,
    pub(crate) timers: FxHashMap<TimerId, TimerFn<S>>,
    pub(crate) messages: FxHashMap<SubscriptionId, MessageFn<S>>,
    /// Completion handler and the playback ticket it belongs to.
    pub(crate) animation: Option<(u64, AnimationFn<S>)>,
}

impl<S> Default for Hooks<S> {
    fn default() -> Self {
        Self {
            collide: SmallVec::new(),
            leave: SmallVec::new(),
            used: SmallVec::new(),
            keypress: SmallVec::new(),
            timers: FxHashMap::default(),
            messages: FxHashMap::default(),
            animation: None,
        }
    }
}

pub(crate) enum AnimationChange<S> {
    Keep,
    Clear,
    Replace(u64, Option<AnimationFn<S>>),
}

/// Registrations made during one handler invocation.
pub(crate) struct Staged<S> {
    pub(crate) hooks: Hooks<S>,
    pub(crate) cancelled: Vec<TimerId>,
    pub(crate) unsubscribed: Vec<SubscriptionId>,
    pub(crate) animation: AnimationChange<S>,
}

impl<S> Default for Staged<S> {
    fn default() -> Self {
        Self {
            hooks: Hooks::default(),
            cancelled: Vec::new(),
            unsubscribed: Vec::new(),
            animation: AnimationChange::Keep,
        }
    }
}

impl<S> Hooks<S> {
    fn absorb(&mut self, staged: &mut Staged<S>) {
        let new = std::mem::take(&mut staged.hooks);
        self.collide.extend(new.collide);
        self.leave.extend(new.leave);
        self.used.extend(new.used);
        self.keypress.extend(new.keypress);
        for id in staged.cancelled.drain(..) {
            self.timers.remove(&id);
        }
        self.timers.extend(new.timers);
        for id in staged.unsubscribed.drain(..) {
            self.messages.remove(&id);
        }
        self.messages.extend(new.messages);
        match std::mem::replace(&mut staged.animation, AnimationChange::Keep) {
            AnimationChange::Keep => {}
            AnimationChange::Clear => self.animation = None,
            AnimationChange::Replace(ticket, handler) => {
                self.animation = handler.map(|h| (ticket, h));
            }
        }
    }
}

/// One actor's state plus its handlers.
pub struct Script<S> {
    state: S,
    main: Option<MainFn<S>>,
    hooks: Hooks<S>,
    staged: Staged<S>,
}

impl<S: Doodad> Script<S> {
    pub fn new(doodad: S) -> Self {
        Self::with_main(doodad, |state: &mut S, api: &mut Api<'_, S>| state.main(api))
    }
}

impl<S: 'static> Script<S> {
    /// Script whose `main` is a closure over plain state.
    pub fn with_main(
        state: S,
        main: impl FnOnce(&mut S, &mut Api<'_, S>) -> ScriptResult<()> + 'static,
    ) -> Self {
        Self {
            state,
            main: Some(Box::new(main)),
            hooks: Hooks::default(),
            staged: Staged::default(),
        }
    }

    pub fn boxed(self) -> Box<dyn ActorScript> {
        Box::new(self)
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    /// Run `f` with an [`Api`] bound to this script, then merge whatever
    /// `f` registered.
    fn run<R>(
        &mut self,
        ctx: &mut ScriptCtx<'_>,
        f: impl FnOnce(&mut S, &mut Hooks<S>, &mut Api<'_, S>) -> ScriptResult<R>,
    ) -> ScriptResult<R> {
        let Script {
            state,
            hooks,
            staged,
            ..
        } = self;
        let result = {
            let mut api = Api::new(ctx.reborrow(), staged);
            f(state, hooks, &mut api)
        };
        hooks.absorb(staged);
        result
    }
}

impl<S: 'static> ActorScript for Script<S> {
    fn run_main(&mut self, ctx: &mut ScriptCtx<'_>) -> ScriptResult<()> {
        let Some(main) = self.main.take() else {
            return Ok(());
        };
        self.run(ctx, |state, _, api| main(state, api))
    }

    fn handles(&self, kind: HandlerKind) -> bool {
        match kind {
            HandlerKind::Collide => !self.hooks.collide.is_empty(),
            HandlerKind::Leave => !self.hooks.leave.is_empty(),
            HandlerKind::Use => !self.hooks.used.is_empty(),
            HandlerKind::Keypress => !self.hooks.keypress.is_empty(),
        }
    }

    fn collide(&mut self, ctx: &mut ScriptCtx<'_>, ev: &CollideEvent) -> ScriptResult<Verdict> {
        self.run(ctx, |state, hooks, api| {
            let mut verdict = Verdict::Unspecified;
            for handler in hooks.collide.iter_mut() {
                verdict = verdict.or(handler(state, api, ev)?);
                if verdict != Verdict::Unspecified {
                    break;
                }
            }
            Ok(verdict)
        })
    }

    fn leave(&mut self, ctx: &mut ScriptCtx<'_>, ev: &LeaveEvent) -> ScriptResult<()> {
        self.run(ctx, |state, hooks, api| {
            for handler in hooks.leave.iter_mut() {
                handler(state, api, ev)?;
            }
            Ok(())
        })
    }

    fn used(&mut self, ctx: &mut ScriptCtx<'_>, ev: &UseEvent) -> ScriptResult<()> {
        self.run(ctx, |state, hooks, api| {
            for handler in hooks.used.iter_mut() {
                handler(state, api, ev)?;
            }
            Ok(())
        })
    }

    fn keypress(&mut self, ctx: &mut ScriptCtx<'_>, ev: &KeypressEvent) -> ScriptResult<()> {
        self.run(ctx, |state, hooks, api| {
            for handler in hooks.keypress.iter_mut() {
                handler(state, api, ev)?;
            }
            Ok(())
        })
    }

    fn timer(&mut self, ctx: &mut ScriptCtx<'_>, id: TimerId) -> ScriptResult<()> {
        self.run(ctx, |state, hooks, api| {
            let Some(mut callback) = hooks.timers.remove(&id) else {
                return Ok(());
            };
            let result = callback(state, api);
            // Repeating timers keep their callback unless it cancelled itself.
            if api.timer_pending(id) {
                hooks.timers.insert(id, callback);
            }
            result
        })
    }

    fn message(
        &mut self,
        ctx: &mut ScriptCtx<'_>,
        sub: SubscriptionId,
        payload: &Payload,
    ) -> ScriptResult<Payload> {
        self.run(ctx, |state, hooks, api| match hooks.messages.get_mut(&sub) {
            Some(handler) => handler(state, api, payload),
            None => Ok(Payload::Nil),
        })
    }

    fn animation_finished(&mut self, ctx: &mut ScriptCtx<'_>, ticket: u64) -> ScriptResult<()> {
        self.run(ctx, |state, hooks, api| match hooks.animation.take() {
            Some((owner, handler)) if owner == ticket => handler(state, api),
            other => {
                hooks.animation = other;
                Ok(())
            }
        })
    }
}
