//! A running level: the ECS world, its actors' scripts and the tick pipeline.
//!
//! # Tick pipeline
//!
//! [`Level::step`] runs one simulation tick in a fixed order:
//!
//! 1. advance [`WorldTime`] and fold in the held buttons
//! 2. run `main` for actors spawned since the last tick
//! 3. fire due timers
//! 4. keypress and use handlers
//! 5. movement (gravity, velocity)
//! 6. collision verdicts, push-out, grounding, leave events
//! 7. animation playback and completion handlers
//! 8. deliver messages still deferred
//!
//! Everything the level asks of the renderer, audio or level flow comes out
//! of [`Level::host_commands`].

use bevy_ecs::message::Messages;
use bevy_ecs::prelude::*;
use crossbeam_channel::Receiver;
use log::info;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::components::actor::{ActorFlags, ActorId, ActorInfo};
use crate::components::animation::Animator;
use crate::components::boxcollider::BoxCollider;
use crate::components::contacts::Contacts;
use crate::components::inventory::Inventory;
use crate::components::mapposition::MapPosition;
use crate::components::rigidbody::RigidBody;
use crate::components::timer::ActorTimers;
use crate::error::SimError;
use crate::events::animation::AnimationFinished;
use crate::events::host::HostCmd;
use crate::geometry::{Point, Rect, Vec2};
use crate::resources::actorindex::ActorIndex;
use crate::resources::hostlink::HostLink;
use crate::resources::input::{Buttons, InputState};
use crate::resources::levelstate::LevelState;
use crate::resources::messagebus::MessageBus;
use crate::resources::simconfig::SimConfig;
use crate::resources::worldtime::WorldTime;
use crate::scripting::{ActorScript, Payload, ScriptHost};
use crate::systems::animation::{animation, dispatch_finished};
use crate::systems::collision::resolve_collisions;
use crate::systems::input::dispatch_input;
use crate::systems::movement::movement_system;
use crate::systems::time::update_world_time;
use crate::systems::timer::fire_due_timers;

/// Authoring data for one actor.
///
/// `links` and `script` are names and paths, resolved by whoever builds the
/// level (see [`crate::scene`]); [`Level::spawn`] ignores them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorSpec {
    /// Name other actors' `links` refer to.
    pub name: String,
    pub filename: String,
    pub title: String,
    pub position: Point,
    pub size: Vec2,
    /// Local hitbox; absent or zero means the whole sprite.
    pub hitbox: Option<Rect>,
    pub velocity: Vec2,
    pub mobile: bool,
    pub gravity: bool,
    pub is_player: bool,
    pub has_inventory: bool,
    pub tags: FxHashMap<String, String>,
    pub links: Vec<String>,
    pub script: Option<String>,
}

pub struct Level {
    world: World,
    host: ScriptHost,
    motion: Schedule,
    animation: Schedule,
    commands: Receiver<HostCmd>,
    held: Buttons,
}

impl Level {
    pub fn new(config: SimConfig) -> Self {
        let mut world = World::new();
        let (link, commands) = HostLink::new();
        world.insert_resource(WorldTime {
            time_scale: config.time_scale,
            ..WorldTime::default()
        });
        world.insert_resource(config);
        world.insert_resource(MessageBus::new());
        world.insert_resource(InputState::default());
        world.insert_resource(LevelState::default());
        world.insert_resource(ActorIndex::default());
        world.insert_resource(link);
        world.init_resource::<Messages<AnimationFinished>>();

        let mut motion = Schedule::default();
        motion.add_systems(movement_system);
        let mut animation_schedule = Schedule::default();
        animation_schedule.add_systems(animation);

        Self {
            world,
            host: ScriptHost::new(),
            motion,
            animation: animation_schedule,
            commands,
            held: Buttons::default(),
        }
    }

    /// Add an actor, optionally with a script whose `main` runs on the next
    /// [`start`](Self::start) or [`step`](Self::step).
    ///
    /// Fails without spawning anything when the size or hitbox is invalid.
    pub fn spawn(
        &mut self,
        spec: &ActorSpec,
        script: Option<Box<dyn ActorScript>>,
    ) -> Result<Entity, SimError> {
        let size = Rect::sized(spec.size.x, spec.size.y)?;
        let mut collider = BoxCollider::new(size.w, size.h);
        if let Some(hitbox) = spec.hitbox {
            collider = collider.with_hitbox(hitbox)?;
        }

        let mut actor_info = ActorInfo::new(spec.filename.clone(), spec.title.clone());
        actor_info.tags = spec.tags.clone();
        let flags = ActorFlags {
            is_player: spec.is_player,
            has_inventory: spec.has_inventory,
            ..ActorFlags::default()
        };
        let body = RigidBody {
            velocity: spec.velocity,
            mobile: spec.mobile,
            gravity: spec.gravity,
            ..RigidBody::default()
        };

        let id = self.world.resource_mut::<ActorIndex>().allocate();
        let entity = self
            .world
            .spawn((
                id,
                actor_info,
                flags,
                MapPosition::new(spec.position.x, spec.position.y),
                body,
                collider,
                Inventory::new(),
                Animator::new(),
                ActorTimers::new(),
                Contacts::default(),
            ))
            .id();
        self.world.resource_mut::<ActorIndex>().insert(id, entity);
        info!(
            target: "level",
            "spawned {} {} at {:?}",
            id,
            if spec.title.is_empty() { &spec.filename } else { &spec.title },
            spec.position
        );

        if let Some(script) = script {
            self.host.install(entity, script);
        }
        Ok(entity)
    }

    /// Add `to` to the outgoing links of `from`.
    pub fn link(&mut self, from: Entity, to: Entity) -> bool {
        if self.world.get::<ActorId>(to).is_none() {
            return false;
        }
        match self.world.get_mut::<ActorInfo>(from) {
            Some(mut info) => {
                if !info.links.contains(&to) {
                    info.links.push(to);
                }
                true
            }
            None => false,
        }
    }

    pub fn destroy(&mut self, actor: Entity) {
        self.host.destroy(&mut self.world, actor);
    }

    /// Run the `main` of every actor spawned so far.
    pub fn start(&mut self) {
        self.host.begin_tick();
        self.host.run_pending_mains(&mut self.world);
        self.host.flush_all_deferred(&mut self.world);
    }

    /// Advance the simulation by one tick.
    pub fn step(&mut self) {
        let tick_ms = self.world.resource::<SimConfig>().tick_ms();
        update_world_time(&mut self.world, tick_ms);
        let held = self.held;
        self.world.resource_mut::<InputState>().apply(held);

        self.host.begin_tick();
        self.host.run_pending_mains(&mut self.world);
        fire_due_timers(&mut self.world, &mut self.host);
        dispatch_input(&mut self.world, &mut self.host);
        self.motion.run(&mut self.world);
        resolve_collisions(&mut self.world, &mut self.host);
        self.animation.run(&mut self.world);
        dispatch_finished(&mut self.world, &mut self.host);
        self.host.flush_all_deferred(&mut self.world);

        self.world.clear_trackers();
    }

    pub fn run_ticks(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.step();
        }
    }

    /// Buttons held from the next tick on.
    pub fn set_input(&mut self, held: Buttons) {
        self.held = held;
    }

    /// Publish on behalf of the embedding host.
    pub fn publish(&mut self, topic: &str, payload: impl Into<Payload>) {
        let payload = payload.into();
        self.host.publish(&mut self.world, None, topic, &payload);
        self.host.flush_all_deferred(&mut self.world);
    }

    pub fn host_commands(&self) -> &Receiver<HostCmd> {
        &self.commands
    }

    /// Everything sent to the host since the last drain, in order.
    pub fn drain_host_commands(&self) -> Vec<HostCmd> {
        self.commands.try_iter().collect()
    }

    pub fn entity(&self, id: ActorId) -> Option<Entity> {
        self.world.resource::<ActorIndex>().get(id)
    }

    pub fn is_alive(&self, actor: Entity) -> bool {
        self.world.get::<ActorId>(actor).is_some()
    }

    pub fn level_state(&self) -> &LevelState {
        self.world.resource::<LevelState>()
    }

    pub fn set_difficulty(&mut self, difficulty: i32) {
        self.world.resource_mut::<LevelState>().difficulty = difficulty;
    }

    pub fn now_ms(&self) -> f64 {
        self.world.resource::<WorldTime>().elapsed_ms
    }

    pub fn tick(&self) -> u64 {
        self.world.resource::<WorldTime>().tick
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn host(&self) -> &ScriptHost {
        &self.host
    }

    // --- inspection helpers ---

    pub fn position(&self, actor: Entity) -> Option<Point> {
        self.world.get::<MapPosition>(actor).map(|p| p.pos)
    }

    pub fn body(&self, actor: Entity) -> Option<&RigidBody> {
        self.world.get::<RigidBody>(actor)
    }

    pub fn inventory(&self, actor: Entity) -> Option<&Inventory> {
        self.world.get::<Inventory>(actor)
    }
}
